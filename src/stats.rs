//! Engagement statistics aggregation
//!
//! Two passes over the event log, both driven by the refresh scheduler:
//! - per product: views, clicks, click-through rate, bounce rate, engagement,
//!   unique-user counts; written as a full table replacement
//! - per category: one pass for each configured product attribute (category,
//!   color, ...), summarizing the per-product metrics of every group with
//!   mean, population standard deviation, and 25th/75th percentiles; written
//!   as upserts keyed by (dimension, value)
//!
//! A product with zero events produces no row at all; the replacement
//! semantics therefore also purge products that disappeared from the log.

use crate::errors::{RecoError, Result};
use crate::metrics::STATS_ROWS;
use crate::recommender::Refreshable;
use crate::source::{InteractionSource, StatsStore};
use crate::types::{
    Action, CategoryDimension, CategoryStats, InteractionEvent, MetricSummary, Product,
    ProductStats,
};
use async_trait::async_trait;
use chrono::Utc;
use ordered_float::OrderedFloat;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Periodic aggregator writing through a [`StatsStore`]
pub struct StatsAggregator {
    source: Arc<dyn InteractionSource>,
    store: Arc<dyn StatsStore>,
    dimensions: Vec<CategoryDimension>,
}

impl StatsAggregator {
    pub fn new(
        source: Arc<dyn InteractionSource>,
        store: Arc<dyn StatsStore>,
        dimensions: Vec<CategoryDimension>,
    ) -> Self {
        Self {
            source,
            store,
            dimensions,
        }
    }

    /// Run the product pass, then every configured category pass
    ///
    /// The product pass aborts the rebuild on failure since the category
    /// passes aggregate its output. Category passes are best-effort per
    /// dimension; the first failure is returned after all were attempted.
    pub async fn rebuild_stats(&self) -> Result<()> {
        let started = Instant::now();
        let events = self
            .source
            .fetch_events()
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;

        let product_rows = aggregate_products(&events);
        let product_count = product_rows.len();
        self.store
            .replace_product_stats(product_rows.clone())
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;
        STATS_ROWS
            .with_label_values(&["product"])
            .set(product_count as i64);

        if self.dimensions.is_empty() {
            info!(
                "📊 Stats refreshed: {} product rows in {:?} (category pass disabled)",
                product_count,
                started.elapsed()
            );
            return Ok(());
        }

        let products = self
            .source
            .fetch_products()
            .await
            .map_err(|e| RecoError::rebuild(self.name(), e))?;

        let mut category_count = 0usize;
        let mut first_failure: Option<RecoError> = None;
        for dimension in &self.dimensions {
            let rows = aggregate_category(*dimension, &products, &product_rows);
            let row_count = rows.len();
            match self.store.upsert_category_stats(rows).await {
                Ok(()) => category_count += row_count,
                Err(e) => {
                    // keep attempting the remaining dimensions
                    let err = RecoError::rebuild(
                        self.name(),
                        e.context(format!("category pass for '{dimension}'")),
                    );
                    error!("❌ {err}");
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }
        STATS_ROWS
            .with_label_values(&["category"])
            .set(category_count as i64);

        match first_failure {
            Some(err) => Err(err),
            None => {
                info!(
                    "📊 Stats refreshed: {} product rows, {} category rows in {:?}",
                    product_count,
                    category_count,
                    started.elapsed()
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Refreshable for StatsAggregator {
    fn name(&self) -> &'static str {
        "stats"
    }

    async fn rebuild(&self) -> Result<()> {
        self.rebuild_stats().await
    }
}

#[derive(Default)]
struct ProductAccumulator {
    views: u64,
    clicks: u64,
    view_users: HashSet<u64>,
    click_users: HashSet<u64>,
}

/// Fold the event log into one row per product that has events
pub(crate) fn aggregate_products(events: &[InteractionEvent]) -> Vec<ProductStats> {
    let mut accumulators: HashMap<u64, ProductAccumulator> = HashMap::new();
    for event in events {
        let acc = accumulators.entry(event.product_id).or_default();
        match event.action {
            Action::View => {
                acc.views += 1;
                acc.view_users.insert(event.user_id);
            }
            Action::Click => {
                acc.clicks += 1;
                acc.click_users.insert(event.user_id);
            }
        }
    }

    let now = Utc::now();
    let mut rows: Vec<ProductStats> = accumulators
        .into_iter()
        .map(|(product_id, acc)| {
            let views = acc.views;
            let clicks = acc.clicks;
            let ctr = if views > 0 {
                clicks as f64 / views as f64
            } else {
                0.0
            };
            let bounce_rate = if views > 0 && views >= clicks {
                (views - clicks) as f64 / views as f64
            } else {
                0.0
            };
            ProductStats {
                product_id,
                views,
                clicks,
                ctr,
                bounce_rate,
                engagement: views + clicks,
                unique_view_count: acc.view_users.len() as u64,
                unique_click_count: acc.click_users.len() as u64,
                last_updated: now,
            }
        })
        .collect();
    rows.sort_unstable_by_key(|row| row.product_id);
    rows
}

/// Group the per-product rows by one product attribute
pub(crate) fn aggregate_category(
    dimension: CategoryDimension,
    products: &[Product],
    product_rows: &[ProductStats],
) -> Vec<CategoryStats> {
    let by_id: HashMap<u64, &ProductStats> = product_rows
        .iter()
        .map(|row| (row.product_id, row))
        .collect();

    // products without a stats row (zero events) drop out of the join
    let mut groups: HashMap<&str, Vec<&ProductStats>> = HashMap::new();
    for product in products {
        if let Some(row) = by_id.get(&product.id) {
            groups
                .entry(dimension.value_of(product))
                .or_default()
                .push(row);
        }
    }

    let now = Utc::now();
    let mut rows: Vec<CategoryStats> = groups
        .into_iter()
        .map(|(key, members)| {
            let ctrs: Vec<f64> = members.iter().map(|r| r.ctr).collect();
            let bounces: Vec<f64> = members.iter().map(|r| r.bounce_rate).collect();
            let engagements: Vec<f64> = members.iter().map(|r| r.engagement as f64).collect();
            CategoryStats {
                dimension,
                key: key.to_string(),
                product_count: members.len() as u64,
                views: members.iter().map(|r| r.views).sum(),
                clicks: members.iter().map(|r| r.clicks).sum(),
                ctr: summarize(&ctrs),
                bounce_rate: summarize(&bounces),
                engagement: summarize(&engagements),
                last_updated: now,
            }
        })
        .collect();
    rows.sort_unstable_by(|a, b| a.key.cmp(&b.key));
    rows
}

fn summarize(values: &[f64]) -> MetricSummary {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by_key(|v| OrderedFloat(*v));
    MetricSummary {
        mean: mean(values),
        std_dev: std_dev(values),
        p25: percentile(&sorted, 25.0),
        p75: percentile(&sorted, 75.0),
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0)
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile with linear interpolation between closest ranks;
/// `sorted` must be ascending
pub(crate) fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = pct / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}
