use crate::error::AppResult;
use crate::models::{SyncBatch, SyncReport};
use crate::services::{mirror::MirrorStore, source::SourceStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Rewrites the mirror from the live source in full on each invocation.
pub struct DataSyncer {
    source: Arc<SourceStore>,
    mirror: Arc<MirrorStore>,
}

impl DataSyncer {
    pub fn new(source: Arc<SourceStore>, mirror: Arc<MirrorStore>) -> Self {
        Self { source, mirror }
    }

    /// Read the full source state, then replace the mirror in one
    /// transaction. Every source read happens before the mirror is touched,
    /// so a failing read leaves the mirror exactly as it was.
    pub async fn sync(&self) -> AppResult<SyncReport> {
        info!("starting data sync from source to mirror");

        let users = self.source.fetch_users().await?;
        let products = self.source.fetch_products().await?;
        let orders = self.source.fetch_orders().await?;
        let order_items = self.source.fetch_order_items().await?;

        let report = SyncReport {
            users: users.len() as u64,
            products: products.len() as u64,
            orders: orders.len() as u64,
            order_items: order_items.len() as u64,
            synced_at: Utc::now(),
        };

        let batch = SyncBatch {
            users,
            products,
            orders,
            order_items,
        };

        self.mirror.ensure_schema().await?;
        self.mirror.replace_all(&batch).await?;

        info!(
            users = report.users,
            products = report.products,
            orders = report.orders,
            order_items = report.order_items,
            "data sync completed"
        );
        Ok(report)
    }
}
