//! Top-level recommendation engine
//!
//! Owns both recommenders, the stats aggregator, and the refresh scheduler,
//! and picks a strategy per request:
//! - a `user_id` routes to the personalized recommender first
//! - when personalization comes back empty and the request carries a
//!   `product_id`, the co-occurrence recommender answers instead
//! - a bare `product_id` goes straight to co-occurrence
//! - neither ID yields an empty list
//!
//! Queries stay synchronous and lock-free on the hot path; all model building
//! happens in the background refresh loops.

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::metrics::{RECOMMEND_DURATION, RECOMMEND_TOTAL};
use crate::recommender::{
    CoOccurrenceRecommender, RecommendRequest, Recommender, Refreshable, UserSimilarityRecommender,
};
use crate::scheduler::{ComponentHealth, RefreshScheduler, RefreshSummary};
use crate::source::{InteractionSource, StatsStore};
use crate::stats::StatsAggregator;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct RecommendationEngine {
    config: EngineConfig,
    personalized: Arc<UserSimilarityRecommender>,
    catalog: Arc<CoOccurrenceRecommender>,
    scheduler: Arc<RefreshScheduler>,
    refresh_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RecommendationEngine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn InteractionSource>,
        store: Arc<dyn StatsStore>,
    ) -> Self {
        config.log();
        let catalog = Arc::new(CoOccurrenceRecommender::new(
            source.clone(),
            config.alpha_smoothing,
        ));
        let personalized = Arc::new(UserSimilarityRecommender::new(
            source.clone(),
            config.cache_ttl(),
            config.cache_max_entries,
        ));
        let stats = Arc::new(StatsAggregator::new(
            source,
            store,
            config.stats_dimensions.clone(),
        ));

        let mut scheduler = RefreshScheduler::new(config.rebuild_timeout());
        scheduler.register(catalog.clone());
        scheduler.register(personalized.clone());
        scheduler.register(stats);

        Self {
            config,
            personalized,
            catalog,
            scheduler: Arc::new(scheduler),
            refresh_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the periodic refresh loops; idempotent
    pub fn start(&self) -> Result<()> {
        let mut tasks = self.refresh_tasks.lock();
        if !tasks.is_empty() {
            return Ok(());
        }
        info!(
            "🚀 Starting refresh loops (recommenders every {}s, stats every {}s)",
            self.config.recommender_refresh_secs, self.config.stats_refresh_secs
        );
        let recommender_interval = self.config.recommender_refresh_interval();
        tasks.push(
            self.scheduler
                .spawn_periodic(self.catalog.name(), recommender_interval)?,
        );
        tasks.push(
            self.scheduler
                .spawn_periodic(self.personalized.name(), recommender_interval)?,
        );
        tasks.push(
            self.scheduler
                .spawn_periodic("stats", self.config.stats_refresh_interval())?,
        );
        Ok(())
    }

    /// Cancel the refresh loops; models stay queryable
    pub fn shutdown(&self) {
        let mut tasks = self.refresh_tasks.lock();
        if tasks.is_empty() {
            return;
        }
        info!("🛑 Stopping {} refresh loop(s)", tasks.len());
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    /// Answer one recommendation request, picking the strategy from its IDs
    pub fn recommend(&self, request: &RecommendRequest) -> Result<Vec<u64>> {
        if let Some(user_id) = request.user_id {
            let results = self.run_strategy(&*self.personalized, request)?;
            if !results.is_empty() {
                return Ok(results);
            }
            if request.product_id.is_some() {
                // cold or unknown user with a seed product still gets an answer
                debug!("No personalized results for user {user_id}, falling back to co-occurrence");
                return self.run_strategy(&*self.catalog, request);
            }
            return Ok(results);
        }

        if request.product_id.is_some() {
            return self.run_strategy(&*self.catalog, request);
        }

        debug!("Recommendation request carried neither user_id nor product_id");
        Ok(Vec::new())
    }

    fn run_strategy(
        &self,
        recommender: &dyn Recommender,
        request: &RecommendRequest,
    ) -> Result<Vec<u64>> {
        let strategy = recommender.strategy().as_str();
        let timer = RECOMMEND_DURATION
            .with_label_values(&[strategy])
            .start_timer();
        let result = recommender.recommend(request);
        timer.observe_duration();
        let outcome = if result.is_ok() { "success" } else { "error" };
        RECOMMEND_TOTAL.with_label_values(&[strategy, outcome]).inc();
        result
    }

    /// Rebuild every component now and report per-component outcomes
    pub async fn force_refresh_all(&self) -> RefreshSummary {
        self.scheduler.force_refresh_all().await
    }

    /// Rebuild one component by name ("cooccurrence", "user_similarity", "stats")
    pub async fn refresh_once(&self, component: &str) -> Result<()> {
        self.scheduler.refresh_once(component).await
    }

    /// Health snapshot of every component
    pub fn status(&self) -> Vec<ComponentHealth> {
        self.scheduler.status()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct handle for product-seeded queries and model introspection
    pub fn cooccurrence(&self) -> &CoOccurrenceRecommender {
        &self.catalog
    }

    /// Direct handle for user-keyed queries and model introspection
    pub fn user_similarity(&self) -> &UserSimilarityRecommender {
        &self.personalized
    }
}

impl Drop for RecommendationEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
