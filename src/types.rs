//! Domain types shared across recommenders, statistics, and storage
//!
//! The engine works on a product catalog and a log of interaction events.
//! Everything here is serde-serializable so sources backed by JSON documents
//! can deserialize straight into these types.

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a user did with a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Click,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(Self::View),
            "click" => Ok(Self::Click),
            other => bail!("unknown action: '{other}'"),
        }
    }
}

/// A single user interaction with a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: u64,
    pub product_id: u64,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    /// Create an event stamped with the current time
    pub fn new(user_id: u64, product_id: u64, action: Action) -> Self {
        Self {
            user_id,
            product_id,
            action,
            timestamp: Utc::now(),
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub title: String,
    pub category: String,
    pub price: f64,
    pub color: String,
    pub material: String,
    pub sizes: Vec<String>,
    pub brand: String,
}

/// Product attribute the category statistics pass can group by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDimension {
    Category,
    Color,
    Material,
    Brand,
}

impl CategoryDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Color => "color",
            Self::Material => "material",
            Self::Brand => "brand",
        }
    }

    /// The grouping key this dimension extracts from a product
    pub fn value_of<'a>(&self, product: &'a Product) -> &'a str {
        match self {
            Self::Category => &product.category,
            Self::Color => &product.color,
            Self::Material => &product.material,
            Self::Brand => &product.brand,
        }
    }
}

impl fmt::Display for CategoryDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryDimension {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "color" => Ok(Self::Color),
            "material" => Ok(Self::Material),
            "brand" => Ok(Self::Brand),
            other => bail!("unknown category dimension: '{other}'"),
        }
    }
}

/// Engagement statistics for one product over the full event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStats {
    pub product_id: u64,
    pub views: u64,
    pub clicks: u64,
    /// clicks / views, 0 when the product has no views
    pub ctr: f64,
    /// (views - clicks) / views, 0 when views are zero or clicks exceed views
    pub bounce_rate: f64,
    /// views + clicks
    pub engagement: u64,
    /// Distinct users who viewed the product
    pub unique_view_count: u64,
    /// Distinct users who clicked the product
    pub unique_click_count: u64,
    pub last_updated: DateTime<Utc>,
}

/// Distribution summary over one per-product metric within a group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub p25: f64,
    pub p75: f64,
}

/// Aggregated statistics for one value of one grouping dimension
/// (e.g. dimension = color, key = "red")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub dimension: CategoryDimension,
    pub key: String,
    pub product_count: u64,
    pub views: u64,
    pub clicks: u64,
    pub ctr: MetricSummary,
    pub bounce_rate: MetricSummary,
    pub engagement: MetricSummary,
    pub last_updated: DateTime<Utc>,
}
