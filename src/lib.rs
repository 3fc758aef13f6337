//! ShopRec Library
//!
//! In-process product recommendation engine for storefront backends.
//! Serves ranked suggestions from periodically rebuilt in-memory models.
//!
//! # Key Features
//! - Co-occurrence recommender (session-level "viewed together" signals)
//! - User-similarity recommender (cosine over interaction histories)
//! - Product and category statistics written through a pluggable store
//! - Background refresh scheduler with per-component health
//!
//! # Serving Properties
//! - Queries never block on rebuilds (atomic snapshot swap)
//! - Failed rebuilds keep the previous model live
//! - TTL cache on the personalized path
//! - No external services required; data arrives through a source trait

pub mod cache;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod index;
pub mod matrix;
pub mod metrics;
pub mod recommender;
pub mod scheduler;
pub mod source;
pub mod stats;
pub mod types;

// Re-export dependencies to ensure tests/benchmarks use the same version
pub use chrono;
pub use parking_lot;
