use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

mod graph;

pub use graph::{ModelArtifact, ModelHandle, ModelState, Neighbor, ProductGraph};

/// Catalog row as mirrored for training. Recreated wholesale on every sync,
/// never patched incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub picture: Option<String>,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub line_total: f64,
}

/// Aggregated purchase strength for one customer/product pair. Derived from
/// the mirror during training, never stored long-term.
#[derive(Debug, Clone, FromRow)]
pub struct Interaction {
    pub customer_id: i64,
    pub product_id: i64,
    pub strength: f64,
}

/// One order line reduced to its basket membership, feeding the
/// co-occurrence fallback.
#[derive(Debug, Clone, FromRow)]
pub struct BasketLine {
    pub order_id: i64,
    pub product_id: i64,
}

/// Full snapshot read from the live source, applied to the mirror in a
/// single transaction.
#[derive(Debug, Default)]
pub struct SyncBatch {
    pub users: Vec<UserRecord>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub picture: Option<String>,
    pub score: f32,
    pub reason: String,
}

impl Recommendation {
    pub fn from_product(product: &Product, score: f32, reason: String) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            brand: product.brand.clone(),
            category: product.category.clone(),
            rating: product.rating,
            picture: product.picture.clone(),
            score,
            reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub users: u64,
    pub products: u64,
    pub orders: u64,
    pub order_items: u64,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub duration_ms: u64,
    pub products: usize,
    pub copurchase_edges: usize,
    pub similarity_edges: usize,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainReport {
    pub sync: SyncReport,
    pub training: TrainingReport,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ArtifactPresence {
    pub copurchase_graph: bool,
    pub similarity_graph: bool,
    pub product_features: bool,
}

impl ArtifactPresence {
    pub fn complete(&self) -> bool {
        self.copurchase_graph && self.similarity_graph && self.product_features
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub trained: bool,
    pub state: ModelState,
    pub artifacts: ArtifactPresence,
    pub source_reachable: bool,
    pub mirror_reachable: bool,
    pub products: usize,
    pub copurchase_edges: usize,
    pub similarity_edges: usize,
    pub serving: HashMap<String, u64>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub trained: bool,
    pub state: ModelState,
    pub artifacts: ArtifactPresence,
    pub products: usize,
    pub copurchase_edges: usize,
    pub similarity_edges: usize,
    pub trained_at: Option<DateTime<Utc>>,
}
