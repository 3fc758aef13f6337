//! Data source and stats storage seams
//!
//! The engine never talks to a concrete database. Rebuilds read through
//! [`InteractionSource`] and the statistics aggregator writes through
//! [`StatsStore`]; deployments plug in whatever backs their catalog and
//! event log. The in-memory implementations here back tests and embedded
//! setups.

use crate::types::{
    Action, CategoryDimension, CategoryStats, InteractionEvent, Product, ProductStats,
};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Read access to the product catalog and interaction event log
#[async_trait]
pub trait InteractionSource: Send + Sync {
    /// Distinct product IDs in the catalog
    async fn distinct_product_ids(&self) -> Result<Vec<u64>>;

    /// Distinct user IDs appearing in the event log
    async fn distinct_user_ids(&self) -> Result<Vec<u64>>;

    /// Full catalog
    async fn fetch_products(&self) -> Result<Vec<Product>>;

    /// Full event log
    async fn fetch_events(&self) -> Result<Vec<InteractionEvent>>;

    /// Product-ID lists grouped by user, one group per user over their whole
    /// history (default: group in memory; sources with server-side
    /// aggregation should override)
    async fn events_by_user(&self) -> Result<HashMap<u64, Vec<u64>>> {
        let events = self.fetch_events().await?;
        let mut grouped: HashMap<u64, Vec<u64>> = HashMap::new();
        for event in events {
            grouped.entry(event.user_id).or_default().push(event.product_id);
        }
        Ok(grouped)
    }
}

/// Write access for aggregated statistics
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Replace the whole per-product table with `rows`
    ///
    /// Implementations must hide the replacement from concurrent readers
    /// (swap a shadow table or use a transaction); readers should never
    /// observe the empty intermediate state.
    async fn replace_product_stats(&self, rows: Vec<ProductStats>) -> Result<()>;

    /// Insert or overwrite category rows keyed by (dimension, key)
    async fn upsert_category_stats(&self, rows: Vec<CategoryStats>) -> Result<()>;
}

fn dedup_in_order(ids: impl Iterator<Item = u64>) -> Vec<u64> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// In-memory catalog and event log
#[derive(Debug, Default)]
pub struct InMemorySource {
    products: RwLock<Vec<Product>>,
    events: RwLock<Vec<InteractionEvent>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) {
        self.products.write().push(product);
    }

    pub fn add_products(&self, products: impl IntoIterator<Item = Product>) {
        self.products.write().extend(products);
    }

    pub fn add_event(&self, event: InteractionEvent) {
        self.events.write().push(event);
    }

    /// Record an interaction stamped with the current time
    pub fn record(&self, user_id: u64, product_id: u64, action: Action) {
        self.add_event(InteractionEvent::new(user_id, product_id, action));
    }

    pub fn clear_events(&self) {
        self.events.write().clear();
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }
}

#[async_trait]
impl InteractionSource for InMemorySource {
    async fn distinct_product_ids(&self) -> Result<Vec<u64>> {
        Ok(dedup_in_order(self.products.read().iter().map(|p| p.id)))
    }

    async fn distinct_user_ids(&self) -> Result<Vec<u64>> {
        Ok(dedup_in_order(self.events.read().iter().map(|e| e.user_id)))
    }

    async fn fetch_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.read().clone())
    }

    async fn fetch_events(&self) -> Result<Vec<InteractionEvent>> {
        Ok(self.events.read().clone())
    }
}

/// In-memory stats tables
#[derive(Debug, Default)]
pub struct InMemoryStatsStore {
    product_rows: RwLock<Vec<ProductStats>>,
    category_rows: RwLock<HashMap<(CategoryDimension, String), CategoryStats>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product_stats(&self) -> Vec<ProductStats> {
        self.product_rows.read().clone()
    }

    pub fn product_stats_for(&self, product_id: u64) -> Option<ProductStats> {
        self.product_rows
            .read()
            .iter()
            .find(|row| row.product_id == product_id)
            .cloned()
    }

    pub fn category_stats(&self) -> Vec<CategoryStats> {
        self.category_rows.read().values().cloned().collect()
    }

    pub fn category_stats_for(
        &self,
        dimension: CategoryDimension,
        key: &str,
    ) -> Option<CategoryStats> {
        self.category_rows
            .read()
            .get(&(dimension, key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn replace_product_stats(&self, rows: Vec<ProductStats>) -> Result<()> {
        // single swap under one write lock, readers never see a gap
        *self.product_rows.write() = rows;
        Ok(())
    }

    async fn upsert_category_stats(&self, rows: Vec<CategoryStats>) -> Result<()> {
        let mut table = self.category_rows.write();
        for row in rows {
            table.insert((row.dimension, row.key.clone()), row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricSummary;
    use chrono::Utc;

    fn product(id: u64) -> Product {
        Product {
            id,
            title: format!("product {id}"),
            category: "misc".to_string(),
            price: 1.0,
            color: "black".to_string(),
            material: "cotton".to_string(),
            sizes: vec![],
            brand: "acme".to_string(),
        }
    }

    fn product_row(product_id: u64, views: u64) -> ProductStats {
        ProductStats {
            product_id,
            views,
            clicks: 0,
            ctr: 0.0,
            bounce_rate: 0.0,
            engagement: views,
            unique_view_count: 1,
            unique_click_count: 0,
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_distinct_ids_keep_first_seen_order() {
        let source = InMemorySource::new();
        source.add_products([product(30), product(10), product(30)]);
        source.record(2, 30, Action::View);
        source.record(1, 10, Action::View);
        source.record(2, 10, Action::Click);

        assert_eq!(source.distinct_product_ids().await.unwrap(), vec![30, 10]);
        assert_eq!(source.distinct_user_ids().await.unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_default_grouping_preserves_event_order() {
        let source = InMemorySource::new();
        source.record(1, 10, Action::View);
        source.record(1, 20, Action::Click);
        source.record(2, 20, Action::View);

        let grouped = source.events_by_user().await.unwrap();
        assert_eq!(grouped[&1], vec![10, 20]);
        assert_eq!(grouped[&2], vec![20]);
    }

    #[tokio::test]
    async fn test_clear_events_keeps_the_catalog() {
        let source = InMemorySource::new();
        source.add_product(product(1));
        source.record(1, 1, Action::View);
        source.record(2, 1, Action::Click);
        assert_eq!(source.event_count(), 2);

        source.clear_events();
        assert_eq!(source.event_count(), 0);
        assert!(source.fetch_events().await.unwrap().is_empty());
        assert_eq!(source.fetch_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_product_stats_swaps_table() {
        let store = InMemoryStatsStore::new();
        store
            .replace_product_stats(vec![product_row(1, 5), product_row(2, 3)])
            .await
            .unwrap();
        assert_eq!(store.product_stats().len(), 2);

        store
            .replace_product_stats(vec![product_row(2, 9)])
            .await
            .unwrap();
        assert_eq!(store.product_stats().len(), 1);
        assert!(store.product_stats_for(1).is_none());
        assert_eq!(store.product_stats_for(2).unwrap().views, 9);
    }

    #[tokio::test]
    async fn test_upsert_category_stats_overwrites_by_key() {
        let store = InMemoryStatsStore::new();
        let summary = MetricSummary {
            mean: 0.0,
            std_dev: 0.0,
            p25: 0.0,
            p75: 0.0,
        };
        let mut row = CategoryStats {
            dimension: CategoryDimension::Color,
            key: "red".to_string(),
            product_count: 1,
            views: 4,
            clicks: 1,
            ctr: summary,
            bounce_rate: summary,
            engagement: summary,
            last_updated: Utc::now(),
        };
        store.upsert_category_stats(vec![row.clone()]).await.unwrap();

        row.views = 8;
        store.upsert_category_stats(vec![row]).await.unwrap();

        let stored = store
            .category_stats_for(CategoryDimension::Color, "red")
            .unwrap();
        assert_eq!(stored.views, 8);
        assert_eq!(store.category_stats().len(), 1);
    }
}
