//! Recommendation strategies
//!
//! Two strategies ship with the engine:
//! - co-occurrence ("customers who viewed X also viewed Y"), keyed by product
//! - user similarity (personalized), keyed by user
//!
//! Both hold an immutable model snapshot that a background rebuild replaces
//! atomically; queries always run against a complete snapshot. The engine
//! and the scheduler hold strategies through the traits here, so a custom
//! strategy can be substituted without touching either.

pub mod cooccurrence;
pub mod user_based;

pub use cooccurrence::{CoOccurrenceModel, CoOccurrenceRecommender};
pub use user_based::{UserSimilarityModel, UserSimilarityRecommender};

use crate::constants::DEFAULT_TOP_N;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Strategy identifier, used for dispatch and as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CoOccurrence,
    UserSimilarity,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoOccurrence => "cooccurrence",
            Self::UserSimilarity => "user_similarity",
        }
    }
}

/// One recommendation query
///
/// `user_id` drives the personalized strategy, `product_id` the
/// co-occurrence strategy; a request carrying both lets the engine fall
/// back from the first to the second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub user_id: Option<u64>,
    pub product_id: Option<u64>,
    pub top_n: usize,
    /// Return uniformly-random catalog products instead of the ranked list
    pub sample: bool,
}

impl Default for RecommendRequest {
    fn default() -> Self {
        Self {
            user_id: None,
            product_id: None,
            top_n: DEFAULT_TOP_N,
            sample: false,
        }
    }
}

impl RecommendRequest {
    pub fn for_user(user_id: u64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn for_product(product_id: u64) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn with_product(mut self, product_id: u64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_sample(mut self, sample: bool) -> Self {
        self.sample = sample;
        self
    }
}

/// A component the scheduler can rebuild in the background
#[async_trait]
pub trait Refreshable: Send + Sync {
    /// Stable component name used in logs, metrics, and scheduler lookups
    fn name(&self) -> &'static str;

    /// Rebuild internal state from the data source
    ///
    /// On failure the previous state stays live; the error is reported, not
    /// fatal.
    async fn rebuild(&self) -> Result<()>;
}

/// A queryable recommendation strategy
///
/// Queries are synchronous: they only read the in-memory snapshot, never
/// the data source.
pub trait Recommender: Refreshable {
    fn strategy(&self) -> Strategy;

    /// Whether a model snapshot is live (at least one rebuild succeeded)
    fn is_ready(&self) -> bool;

    fn recommend(&self, request: &RecommendRequest) -> Result<Vec<u64>>;
}
