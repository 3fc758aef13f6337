//! Co-occurrence recommender: "customers who viewed X also viewed Y"
//!
//! The model is a symmetric product × product matrix counting how often two
//! distinct products appear in the same user's history, Laplace-smoothed
//! into per-row probability distributions. Rebuilds construct a complete
//! new snapshot off to the side and swap it in with a single pointer
//! replacement, so queries never observe a half-built model.

use crate::errors::{RecoError, Result};
use crate::index::IdIndex;
use crate::matrix::{laplace_smoothed, DenseMatrix};
use crate::metrics::MODEL_ENTITIES;
use crate::recommender::{RecommendRequest, Recommender, Refreshable, Strategy};
use crate::source::InteractionSource;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// One immutable model snapshot
#[derive(Debug)]
pub struct CoOccurrenceModel {
    pub products: IdIndex,
    /// Symmetric co-occurrence counts with zero diagonal
    pub counts: DenseMatrix,
    /// Laplace-smoothed rows, each a probability distribution
    pub probabilities: DenseMatrix,
    pub session_count: usize,
    pub built_at: DateTime<Utc>,
}

/// Product-keyed recommender over co-occurrence probabilities
pub struct CoOccurrenceRecommender {
    source: Arc<dyn InteractionSource>,
    alpha: f64,
    model: RwLock<Option<Arc<CoOccurrenceModel>>>,
}

impl CoOccurrenceRecommender {
    /// `alpha` is the additive smoothing factor, must be positive
    pub fn new(source: Arc<dyn InteractionSource>, alpha: f64) -> Self {
        debug_assert!(alpha > 0.0, "smoothing factor must be positive");
        Self {
            source,
            alpha,
            model: RwLock::new(None),
        }
    }

    /// Current snapshot, if at least one rebuild succeeded
    pub fn model(&self) -> Option<Arc<CoOccurrenceModel>> {
        self.model.read().clone()
    }

    /// Rebuild the model from the data source and swap it in atomically
    pub async fn rebuild_model(&self) -> Result<()> {
        let started = Instant::now();
        let product_ids = self
            .source
            .distinct_product_ids()
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;
        let sessions = self
            .source
            .events_by_user()
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;

        // counting is O(products² + Σ session²), keep it off the runtime
        let alpha = self.alpha;
        let model =
            tokio::task::spawn_blocking(move || build_model(product_ids, sessions, alpha))
                .await
                .map_err(|e| RecoError::rebuild("cooccurrence", anyhow!(e)))?;

        MODEL_ENTITIES
            .with_label_values(&["cooccurrence", "products"])
            .set(model.products.len() as i64);
        MODEL_ENTITIES
            .with_label_values(&["cooccurrence", "sessions"])
            .set(model.session_count as i64);
        info!(
            "🛒 Co-occurrence model rebuilt: {} products from {} sessions in {:?}",
            model.products.len(),
            model.session_count,
            started.elapsed()
        );

        *self.model.write() = Some(Arc::new(model));
        Ok(())
    }

    /// Products most likely to co-occur with `product_id`
    ///
    /// With `sample` set, returns uniformly-random distinct catalog products
    /// instead of the ranked list. Either way the product must exist in the
    /// current snapshot.
    pub fn recommend_for_product(
        &self,
        product_id: u64,
        top_n: usize,
        sample: bool,
    ) -> Result<Vec<u64>> {
        // no snapshot yet means no product is known
        let model = self
            .model()
            .ok_or(RecoError::ProductNotFound(product_id))?;
        let pos = model
            .products
            .position(product_id)
            .ok_or(RecoError::ProductNotFound(product_id))?;

        if top_n == 0 {
            return Ok(Vec::new());
        }

        if sample {
            let mut ids = model.products.ids().to_vec();
            let mut rng = rand::thread_rng();
            ids.shuffle(&mut rng);
            ids.truncate(top_n);
            return Ok(ids);
        }

        let row = model.probabilities.row(pos);
        let mut scored: Vec<(OrderedFloat<f64>, usize)> = row
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != pos)
            .map(|(j, &p)| (OrderedFloat(p), j))
            .collect();
        // stable sort: ties keep dense-index order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_n)
            .map(|(_, j)| model.products.id_at(j))
            .collect())
    }
}

#[async_trait]
impl Refreshable for CoOccurrenceRecommender {
    fn name(&self) -> &'static str {
        "cooccurrence"
    }

    async fn rebuild(&self) -> Result<()> {
        self.rebuild_model().await
    }
}

impl Recommender for CoOccurrenceRecommender {
    fn strategy(&self) -> Strategy {
        Strategy::CoOccurrence
    }

    fn is_ready(&self) -> bool {
        self.model.read().is_some()
    }

    fn recommend(&self, request: &RecommendRequest) -> Result<Vec<u64>> {
        let product_id = request.product_id.ok_or_else(|| {
            RecoError::Internal(anyhow!("co-occurrence strategy requires a product_id"))
        })?;
        self.recommend_for_product(product_id, request.top_n, request.sample)
    }
}

fn build_model(
    product_ids: Vec<u64>,
    sessions: HashMap<u64, Vec<u64>>,
    alpha: f64,
) -> CoOccurrenceModel {
    let products = IdIndex::from_ids(product_ids);
    let n = products.len();
    let session_count = sessions.len();

    let mut counts = DenseMatrix::zeros(n, n);
    for viewed in sessions.into_values() {
        for a in 0..viewed.len() {
            for b in (a + 1)..viewed.len() {
                let (Some(i), Some(j)) =
                    (products.position(viewed[a]), products.position(viewed[b]))
                else {
                    // event references a product missing from this catalog snapshot
                    continue;
                };
                if i == j {
                    // same product seen twice in one session, diagonal stays zero
                    continue;
                }
                counts.add_at(i, j, 1.0);
                counts.add_at(j, i, 1.0);
            }
        }
    }

    let probabilities = laplace_smoothed(&counts, alpha);
    CoOccurrenceModel {
        products,
        counts,
        probabilities,
        session_count,
        built_at: Utc::now(),
    }
}
