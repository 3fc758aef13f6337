//! Personalized recommender over user-user cosine similarity
//!
//! The model is a user × product interaction count matrix plus the pairwise
//! cosine similarity of its rows. A user's score for a product is the
//! similarity-weighted sum of every other user's interaction count with it;
//! products the user already touched are masked out, and only strictly
//! positive scores are returned.
//!
//! Results are cached per (user_id, top_n) for a fixed TTL. The cache is not
//! invalidated on rebuild; staleness is bounded by the TTL alone.

use crate::cache::TtlCache;
use crate::constants::INTERACTED_SENTINEL;
use crate::errors::{RecoError, Result};
use crate::index::IdIndex;
use crate::matrix::{cosine_similarity_matrix, DenseMatrix};
use crate::metrics::{CACHE_EVENTS, MODEL_ENTITIES};
use crate::recommender::{RecommendRequest, Recommender, Refreshable, Strategy};
use crate::source::InteractionSource;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One immutable model snapshot
#[derive(Debug)]
pub struct UserSimilarityModel {
    pub users: IdIndex,
    pub products: IdIndex,
    /// users × products interaction counts (views and clicks weigh equally)
    pub interactions: DenseMatrix,
    /// users × users cosine similarity; `None` when the interaction matrix
    /// was empty or all-zero, in which case every query yields nothing
    pub similarity: Option<DenseMatrix>,
    pub built_at: DateTime<Utc>,
}

/// User-keyed personalized recommender
pub struct UserSimilarityRecommender {
    source: Arc<dyn InteractionSource>,
    model: RwLock<Option<Arc<UserSimilarityModel>>>,
    cache: TtlCache<(u64, usize), Vec<u64>>,
}

impl UserSimilarityRecommender {
    pub fn new(
        source: Arc<dyn InteractionSource>,
        cache_ttl: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            source,
            model: RwLock::new(None),
            cache: TtlCache::new(cache_ttl, cache_capacity),
        }
    }

    /// Current snapshot, if at least one rebuild succeeded
    pub fn model(&self) -> Option<Arc<UserSimilarityModel>> {
        self.model.read().clone()
    }

    /// Rebuild the model from the data source and swap it in atomically
    pub async fn rebuild_model(&self) -> Result<()> {
        let started = Instant::now();
        let user_ids = self
            .source
            .distinct_user_ids()
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;
        let product_ids = self
            .source
            .distinct_product_ids()
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;
        let grouped = self
            .source
            .events_by_user()
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;

        // the users × users similarity build is quadratic, keep it off the runtime
        let model =
            tokio::task::spawn_blocking(move || build_model(user_ids, product_ids, grouped))
                .await
                .map_err(|e| RecoError::rebuild("user_similarity", anyhow!(e)))?;

        MODEL_ENTITIES
            .with_label_values(&["user_similarity", "users"])
            .set(model.users.len() as i64);
        MODEL_ENTITIES
            .with_label_values(&["user_similarity", "products"])
            .set(model.products.len() as i64);
        info!(
            "👥 User-similarity model rebuilt: {} users × {} products in {:?}{}",
            model.users.len(),
            model.products.len(),
            started.elapsed(),
            if model.similarity.is_none() {
                " (degenerate, queries return empty)"
            } else {
                ""
            }
        );

        *self.model.write() = Some(Arc::new(model));
        Ok(())
    }

    /// Personalized recommendations for `user_id`
    ///
    /// Fails closed: an unknown user, a not-yet-built model, or a degenerate
    /// similarity matrix all yield an empty list rather than an error.
    pub fn recommend_for_user(&self, user_id: u64, top_n: usize) -> Vec<u64> {
        if top_n == 0 {
            return Vec::new();
        }

        let key = (user_id, top_n);
        if let Some(hit) = self.cache.get(&key) {
            CACHE_EVENTS.with_label_values(&["hit"]).inc();
            debug!("personalized result cache hit for user {user_id}");
            return hit;
        }
        CACHE_EVENTS.with_label_values(&["miss"]).inc();

        let picks = self.compute(user_id, top_n);
        self.cache.insert(key, picks.clone());
        picks
    }

    fn compute(&self, user_id: u64, top_n: usize) -> Vec<u64> {
        let Some(model) = self.model() else {
            return Vec::new();
        };
        let Some(similarity) = model.similarity.as_ref() else {
            return Vec::new();
        };
        let Some(u) = model.users.position(user_id) else {
            debug!("user {user_id} unknown to the current model");
            return Vec::new();
        };

        // weighted vote of every other user, no neighbor truncation
        let mut scores = vec![0.0f64; model.products.len()];
        for v in 0..model.users.len() {
            if v == u {
                continue;
            }
            let weight = similarity.get(u, v);
            if weight == 0.0 {
                continue;
            }
            for (p, &count) in model.interactions.row(v).iter().enumerate() {
                if count != 0.0 {
                    scores[p] += weight * count;
                }
            }
        }

        // already-interacted products can never be recommended back
        for (p, &count) in model.interactions.row(u).iter().enumerate() {
            if count > 0.0 {
                scores[p] = INTERACTED_SENTINEL;
            }
        }

        let mut ranked: Vec<(OrderedFloat<f64>, usize)> = scores
            .iter()
            .enumerate()
            .filter(|(_, &s)| s > 0.0)
            .map(|(p, &s)| (OrderedFloat(s), p))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        ranked
            .into_iter()
            .take(top_n)
            .map(|(_, p)| model.products.id_at(p))
            .collect()
    }
}

#[async_trait]
impl Refreshable for UserSimilarityRecommender {
    fn name(&self) -> &'static str {
        "user_similarity"
    }

    async fn rebuild(&self) -> Result<()> {
        self.rebuild_model().await
    }
}

impl Recommender for UserSimilarityRecommender {
    fn strategy(&self) -> Strategy {
        Strategy::UserSimilarity
    }

    fn is_ready(&self) -> bool {
        self.model.read().is_some()
    }

    fn recommend(&self, request: &RecommendRequest) -> Result<Vec<u64>> {
        let user_id = request.user_id.ok_or_else(|| {
            RecoError::Internal(anyhow!("user-similarity strategy requires a user_id"))
        })?;
        Ok(self.recommend_for_user(user_id, request.top_n))
    }
}

fn build_model(
    user_ids: Vec<u64>,
    product_ids: Vec<u64>,
    grouped: HashMap<u64, Vec<u64>>,
) -> UserSimilarityModel {
    let users = IdIndex::from_ids(user_ids);
    let products = IdIndex::from_ids(product_ids);

    let mut interactions = DenseMatrix::zeros(users.len(), products.len());
    for (user_id, viewed) in grouped {
        let Some(u) = users.position(user_id) else {
            continue;
        };
        for product_id in viewed {
            if let Some(p) = products.position(product_id) {
                interactions.add_at(u, p, 1.0);
            }
        }
    }

    let degenerate = users.is_empty() || products.is_empty() || interactions.is_all_zero();
    let similarity = if degenerate {
        // leave the matrix absent; recommend() then fails closed
        warn!("⚠️ {}", RecoError::DegenerateSimilarity);
        None
    } else {
        Some(cosine_similarity_matrix(&interactions))
    };

    UserSimilarityModel {
        users,
        products,
        interactions,
        similarity,
        built_at: Utc::now(),
    }
}
