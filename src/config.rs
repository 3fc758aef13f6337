//! Configuration for the recommendation engine
//!
//! All configurable parameters in one place with environment variable
//! overrides. Follows the principle: sensible defaults, configurable in
//! production.

use crate::constants::{
    DEFAULT_ALPHA_SMOOTHING, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_REBUILD_TIMEOUT_SECS, DEFAULT_RECOMMENDER_REFRESH_SECS, DEFAULT_STATS_REFRESH_SECS,
};
use crate::types::CategoryDimension;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

/// Engine configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Additive smoothing factor for co-occurrence probabilities
    /// (default: 1.0, must be positive)
    pub alpha_smoothing: f64,

    /// TTL for cached personalized results in seconds (default: 300)
    pub cache_ttl_secs: u64,

    /// Maximum entries in the result cache (default: 10000, 0 disables)
    pub cache_max_entries: usize,

    /// Seconds between recommender model rebuilds (default: 500)
    pub recommender_refresh_secs: u64,

    /// Seconds between statistics aggregation runs (default: 300)
    pub stats_refresh_secs: u64,

    /// Upper bound on one rebuild in seconds (default: 0 = unlimited)
    pub rebuild_timeout_secs: u64,

    /// Product attributes the category statistics pass groups by
    /// (default: category, color)
    pub stats_dimensions: Vec<CategoryDimension>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha_smoothing: DEFAULT_ALPHA_SMOOTHING,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            recommender_refresh_secs: DEFAULT_RECOMMENDER_REFRESH_SECS,
            stats_refresh_secs: DEFAULT_STATS_REFRESH_SECS,
            rebuild_timeout_secs: DEFAULT_REBUILD_TIMEOUT_SECS,
            stats_dimensions: vec![CategoryDimension::Category, CategoryDimension::Color],
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults
    #[allow(clippy::field_reassign_with_default)] // Environment overrides require mutable config
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("SHOPREC_ALPHA_SMOOTHING") {
            match val.parse::<f64>() {
                Ok(n) if n > 0.0 => config.alpha_smoothing = n,
                _ => warn!(
                    "SHOPREC_ALPHA_SMOOTHING '{}' is not a positive number, keeping {}",
                    val, config.alpha_smoothing
                ),
            }
        }

        if let Ok(val) = env::var("SHOPREC_CACHE_TTL_SECS") {
            if let Ok(n) = val.parse() {
                config.cache_ttl_secs = n;
            }
        }

        if let Ok(val) = env::var("SHOPREC_CACHE_MAX_ENTRIES") {
            if let Ok(n) = val.parse() {
                config.cache_max_entries = n;
            }
        }

        if let Ok(val) = env::var("SHOPREC_RECOMMENDER_REFRESH_SECS") {
            if let Ok(n) = val.parse() {
                config.recommender_refresh_secs = n;
            }
        }

        if let Ok(val) = env::var("SHOPREC_STATS_REFRESH_SECS") {
            if let Ok(n) = val.parse() {
                config.stats_refresh_secs = n;
            }
        }

        if let Ok(val) = env::var("SHOPREC_REBUILD_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                config.rebuild_timeout_secs = n;
            }
        }

        if let Ok(val) = env::var("SHOPREC_STATS_DIMENSIONS") {
            config.stats_dimensions = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<CategoryDimension>() {
                    Ok(dim) => Some(dim),
                    Err(_) => {
                        warn!("SHOPREC_STATS_DIMENSIONS: unknown dimension '{}' - skipping", s);
                        None
                    }
                })
                .collect();
        }

        config
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn recommender_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.recommender_refresh_secs)
    }

    pub fn stats_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stats_refresh_secs)
    }

    /// Per-rebuild bound, `None` when disabled
    pub fn rebuild_timeout(&self) -> Option<Duration> {
        if self.rebuild_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.rebuild_timeout_secs))
        }
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("📋 Engine configuration:");
        info!("   Alpha smoothing: {}", self.alpha_smoothing);
        info!(
            "   Result cache: {} entries max, TTL {}s",
            self.cache_max_entries, self.cache_ttl_secs
        );
        info!(
            "   Refresh intervals: recommenders {}s, stats {}s",
            self.recommender_refresh_secs, self.stats_refresh_secs
        );
        if self.rebuild_timeout_secs > 0 {
            info!("   Rebuild timeout: {}s", self.rebuild_timeout_secs);
        } else {
            info!("   Rebuild timeout: disabled");
        }
        if self.stats_dimensions.is_empty() {
            info!("   Category stats: disabled (no dimensions)");
        } else {
            let dims: Vec<&str> = self.stats_dimensions.iter().map(|d| d.as_str()).collect();
            info!("   Category stats dimensions: {}", dims.join(", "));
        }
    }
}

/// Environment variable documentation
#[allow(unused)] // Public API - available for CLI help output
pub fn print_env_help() {
    println!("shoprec Configuration Environment Variables:");
    println!();
    println!("  SHOPREC_ALPHA_SMOOTHING          - Laplace smoothing factor, > 0 (default: 1.0)");
    println!("  SHOPREC_CACHE_TTL_SECS           - Personalized result cache TTL (default: 300)");
    println!("  SHOPREC_CACHE_MAX_ENTRIES        - Result cache capacity, 0 disables (default: 10000)");
    println!("  SHOPREC_RECOMMENDER_REFRESH_SECS - Seconds between model rebuilds (default: 500)");
    println!("  SHOPREC_STATS_REFRESH_SECS       - Seconds between stats runs (default: 300)");
    println!("  SHOPREC_REBUILD_TIMEOUT_SECS     - Per-rebuild bound, 0 = unlimited (default: 0)");
    println!("  SHOPREC_STATS_DIMENSIONS         - Comma-separated grouping attributes out of");
    println!("                                     category,color,material,brand (default: category,color)");
    println!();
    println!("  RUST_LOG                         - Log level (e.g., info, debug, trace)");
    println!();
}
