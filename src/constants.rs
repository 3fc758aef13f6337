//! Documented constants for the recommendation engine
//!
//! This module contains all tunable parameters with justification for their values.
//! Centralizing constants prevents magic numbers and makes tuning easier.

// =============================================================================
// SMOOTHING CONSTANTS
// Laplace (additive) smoothing keeps the co-occurrence probability matrix
// free of zero rows so that cold products still rank deterministically.
// =============================================================================

/// Additive smoothing factor for co-occurrence probabilities
///
/// Each matrix row is normalized as (count + alpha) / (row_total + alpha * n).
///
/// Justification:
/// - alpha = 1.0 is classic add-one smoothing: simple and well understood
/// - Keeps every row a proper probability distribution (sums to 1) even for
///   products that never co-occurred with anything
/// - Small catalogs are dominated by real counts almost immediately, so the
///   prior washes out after a handful of sessions
pub const DEFAULT_ALPHA_SMOOTHING: f64 = 1.0;

/// Tolerance when asserting that a smoothed row sums to 1
///
/// Accumulated f64 rounding across a row of n additions stays far below this
/// for any realistic catalog size.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

// =============================================================================
// QUERY CONSTANTS
// =============================================================================

/// Default number of recommendations per query
///
/// Justification:
/// - Five items fill a typical "customers also viewed" shelf without pushing
///   low-confidence tail items
/// - Callers can override per request; this is only the constructor default
pub const DEFAULT_TOP_N: usize = 5;

/// Sentinel score assigned to products the user already interacted with
///
/// Weighted scores are non-negative (cosine similarity of count vectors times
/// non-negative counts), so any value below zero guarantees exclusion once
/// the strictly-positive filter runs.
pub const INTERACTED_SENTINEL: f64 = -1.0;

// =============================================================================
// CACHE CONSTANTS
// =============================================================================

/// TTL for cached personalized recommendation results (5 minutes)
///
/// Justification:
/// - Matches the stats refresh cadence, so cached results are never staler
///   than one aggregation cycle
/// - Personalized rankings drift slowly; five minutes of staleness is
///   invisible to users but absorbs repeated page loads
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Maximum entries held by the recommendation result cache
///
/// Each entry is a handful of product IDs keyed by (user_id, top_n), so ten
/// thousand entries stay well under a megabyte while covering the active
/// user population between rebuilds.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// REFRESH CONSTANTS
// =============================================================================

/// Interval between recommender model rebuilds (seconds)
///
/// Justification:
/// - Co-occurrence and similarity matrices change meaningfully only after a
///   batch of new events, not per event
/// - A little over eight minutes keeps models fresh without hammering the
///   event source on large catalogs
pub const DEFAULT_RECOMMENDER_REFRESH_SECS: u64 = 500;

/// Interval between statistics aggregation runs (seconds)
///
/// Stats feed dashboards and merchandising rules, which tolerate five-minute
/// granularity; running more often mostly recomputes identical rows.
pub const DEFAULT_STATS_REFRESH_SECS: u64 = 300;

/// Upper bound on a single rebuild, in seconds (0 = unlimited)
///
/// When set, a rebuild exceeding the bound is abandoned and reported as a
/// failure; the previous model stays live. Disabled by default because
/// rebuild time scales with the event source and deployments differ widely.
pub const DEFAULT_REBUILD_TIMEOUT_SECS: u64 = 0;
