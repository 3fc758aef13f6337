//! Statistics aggregator tests
//!
//! Covers both write passes against in-memory source and store:
//! - Product rows with CTR, bounce rate, engagement, and unique counts
//! - Replacement semantics of the product pass
//! - Category rollups per configured dimension with summary statistics
//! - Best-effort category passes when the store misbehaves
//!
//! Run with: `cargo test --test stats_tests`

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use shoprec::source::{InMemorySource, InMemoryStatsStore, StatsStore};
use shoprec::stats::StatsAggregator;
use shoprec::types::{
    Action, CategoryDimension, CategoryStats, InteractionEvent, Product, ProductStats,
};

// ═══════════════════════════════════════════════════════════════════════
// Test infrastructure
// ═══════════════════════════════════════════════════════════════════════

const EPS: f64 = 1e-9;

fn product(id: u64, category: &str, color: &str) -> Product {
    Product {
        id,
        title: format!("product-{id}"),
        category: category.to_string(),
        price: 42.0,
        color: color.to_string(),
        material: "wool".to_string(),
        sizes: vec!["m".to_string()],
        brand: "acme".to_string(),
    }
}

/// p1 (shirts/red): 3 views by distinct users, 1 click.
/// p2 (shirts/blue): 1 view, no clicks.
/// p3 (pants/red): 1 view, 1 click by the same user.
fn seeded_source() -> Arc<InMemorySource> {
    let source = Arc::new(InMemorySource::new());
    source.add_product(product(1, "shirts", "red"));
    source.add_product(product(2, "shirts", "blue"));
    source.add_product(product(3, "pants", "red"));
    for (user_id, product_id, action) in [
        (1, 1, Action::View),
        (2, 1, Action::View),
        (3, 1, Action::View),
        (1, 1, Action::Click),
        (1, 2, Action::View),
        (2, 3, Action::View),
        (2, 3, Action::Click),
    ] {
        source.add_event(InteractionEvent::new(user_id, product_id, action));
    }
    source
}

fn aggregator(
    source: Arc<InMemorySource>,
    store: Arc<InMemoryStatsStore>,
    dimensions: Vec<CategoryDimension>,
) -> StatsAggregator {
    StatsAggregator::new(source, store, dimensions)
}

/// Store wrapper with switchable failures and an attempt counter
#[derive(Default)]
struct FailingStore {
    inner: InMemoryStatsStore,
    fail_products: AtomicBool,
    fail_categories: AtomicBool,
    category_attempts: AtomicUsize,
}

#[async_trait]
impl StatsStore for FailingStore {
    async fn replace_product_stats(&self, rows: Vec<ProductStats>) -> anyhow::Result<()> {
        if self.fail_products.load(Ordering::SeqCst) {
            bail!("stats db offline");
        }
        self.inner.replace_product_stats(rows).await
    }

    async fn upsert_category_stats(&self, rows: Vec<CategoryStats>) -> anyhow::Result<()> {
        self.category_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_categories.load(Ordering::SeqCst) {
            bail!("stats db offline");
        }
        self.inner.upsert_category_stats(rows).await
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Product pass
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_product_rows_carry_all_derived_fields() {
    let store = Arc::new(InMemoryStatsStore::new());
    let stats = aggregator(seeded_source(), store.clone(), vec![]);
    stats.rebuild_stats().await.expect("rebuild");

    let row = store.product_stats_for(1).expect("row for product 1");
    assert_eq!(row.views, 3);
    assert_eq!(row.clicks, 1);
    assert!((row.ctr - 1.0 / 3.0).abs() < EPS);
    assert!((row.bounce_rate - 2.0 / 3.0).abs() < EPS);
    assert_eq!(row.engagement, 4);
    assert_eq!(row.unique_view_count, 3);
    assert_eq!(row.unique_click_count, 1);

    let row = store.product_stats_for(3).expect("row for product 3");
    assert!((row.ctr - 1.0).abs() < EPS);
    assert!((row.bounce_rate - 0.0).abs() < EPS);
    assert_eq!(row.engagement, 2);
}

#[tokio::test]
async fn test_products_without_events_get_no_row() {
    let source = seeded_source();
    source.add_product(product(4, "hats", "green"));
    let store = Arc::new(InMemoryStatsStore::new());
    let stats = aggregator(source, store.clone(), vec![]);
    stats.rebuild_stats().await.expect("rebuild");

    assert_eq!(store.product_stats().len(), 3);
    assert!(store.product_stats_for(4).is_none());
}

#[tokio::test]
async fn test_product_pass_replaces_wholesale() {
    let source = seeded_source();
    let store = Arc::new(InMemoryStatsStore::new());
    let stats = aggregator(source.clone(), store.clone(), vec![]);
    stats.rebuild_stats().await.expect("first rebuild");
    assert_eq!(store.product_stats().len(), 3);

    // shrink the history; stale rows must not linger
    source.clear_events();
    source.add_event(InteractionEvent::new(9, 2, Action::View));
    stats.rebuild_stats().await.expect("second rebuild");

    let rows = store.product_stats();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_id, 2);
    assert_eq!(rows[0].views, 1);
}

// ═══════════════════════════════════════════════════════════════════════
// Category passes
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_category_rollups_group_by_each_dimension() {
    let store = Arc::new(InMemoryStatsStore::new());
    let stats = aggregator(
        seeded_source(),
        store.clone(),
        vec![CategoryDimension::Category, CategoryDimension::Color],
    );
    stats.rebuild_stats().await.expect("rebuild");

    let shirts = store
        .category_stats_for(CategoryDimension::Category, "shirts")
        .expect("shirts rollup");
    assert_eq!(shirts.product_count, 2);
    assert_eq!(shirts.views, 4);
    assert_eq!(shirts.clicks, 1);

    let red = store
        .category_stats_for(CategoryDimension::Color, "red")
        .expect("red rollup");
    assert_eq!(red.product_count, 2);
    assert_eq!(red.views, 4);
    assert_eq!(red.clicks, 2);

    let blue = store
        .category_stats_for(CategoryDimension::Color, "blue")
        .expect("blue rollup");
    assert_eq!(blue.product_count, 1);
    assert_eq!(blue.views, 1);
    assert_eq!(blue.clicks, 0);
}

#[tokio::test]
async fn test_category_summaries_use_population_statistics() {
    let store = Arc::new(InMemoryStatsStore::new());
    let stats = aggregator(
        seeded_source(),
        store.clone(),
        vec![CategoryDimension::Category],
    );
    stats.rebuild_stats().await.expect("rebuild");

    // shirts CTRs are [1/3, 0]
    let shirts = store
        .category_stats_for(CategoryDimension::Category, "shirts")
        .expect("shirts rollup");
    assert!((shirts.ctr.mean - 1.0 / 6.0).abs() < EPS);
    assert!((shirts.ctr.std_dev - 1.0 / 6.0).abs() < EPS);
    assert!((shirts.ctr.p25 - 1.0 / 12.0).abs() < EPS);
    assert!((shirts.ctr.p75 - 0.25).abs() < EPS);
    assert!((shirts.engagement.mean - 2.5).abs() < EPS);

    // single-product group collapses every summary onto that product
    let pants = store
        .category_stats_for(CategoryDimension::Category, "pants")
        .expect("pants rollup");
    assert!((pants.ctr.mean - 1.0).abs() < EPS);
    assert!((pants.ctr.std_dev - 0.0).abs() < EPS);
    assert!((pants.ctr.p25 - 1.0).abs() < EPS);
    assert!((pants.ctr.p75 - 1.0).abs() < EPS);
}

#[tokio::test]
async fn test_unconfigured_dimensions_are_skipped() {
    let store = Arc::new(InMemoryStatsStore::new());
    let stats = aggregator(
        seeded_source(),
        store.clone(),
        vec![CategoryDimension::Color],
    );
    stats.rebuild_stats().await.expect("rebuild");

    assert!(store
        .category_stats_for(CategoryDimension::Category, "shirts")
        .is_none());
    assert!(store
        .category_stats_for(CategoryDimension::Color, "red")
        .is_some());
}

// ═══════════════════════════════════════════════════════════════════════
// Failure handling
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_category_failures_are_best_effort() {
    let store = Arc::new(FailingStore::default());
    store.fail_categories.store(true, Ordering::SeqCst);
    let stats = StatsAggregator::new(
        seeded_source(),
        store.clone(),
        vec![CategoryDimension::Category, CategoryDimension::Color],
    );

    let err = stats.rebuild_stats().await.unwrap_err();
    assert_eq!(err.code(), "REBUILD_FAILED");

    // both dimensions were attempted despite the first failing
    assert_eq!(store.category_attempts.load(Ordering::SeqCst), 2);
    // the product pass landed before the category failures
    assert_eq!(store.inner.product_stats().len(), 3);
}

#[tokio::test]
async fn test_product_pass_failure_aborts_the_rebuild() {
    let store = Arc::new(FailingStore::default());
    store.fail_products.store(true, Ordering::SeqCst);
    let stats = StatsAggregator::new(
        seeded_source(),
        store.clone(),
        vec![CategoryDimension::Category],
    );

    let err = stats.rebuild_stats().await.unwrap_err();
    assert_eq!(err.code(), "REBUILD_FAILED");
    assert_eq!(store.category_attempts.load(Ordering::SeqCst), 0);
}
