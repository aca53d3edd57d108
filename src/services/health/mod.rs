use crate::models::{HealthReport, HealthStatus, ModelHandle, ModelInfo};
use crate::services::{
    artifacts::ArtifactStore, mirror::MirrorStore, recommendation::RecommendationService,
    source::SourceStore, Reachable,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Summarizes trained state, artifact presence, store reachability and graph
/// sizes. Reporting never fails; a broken dependency shows up as a degraded
/// field, the server keeps serving through its fallback paths.
pub struct HealthService {
    source: Arc<SourceStore>,
    mirror: Arc<MirrorStore>,
    artifacts: Arc<ArtifactStore>,
    model: Arc<ModelHandle>,
    recommendation: Arc<RecommendationService>,
}

impl HealthService {
    pub fn new(
        source: Arc<SourceStore>,
        mirror: Arc<MirrorStore>,
        artifacts: Arc<ArtifactStore>,
        model: Arc<ModelHandle>,
        recommendation: Arc<RecommendationService>,
    ) -> Self {
        Self {
            source,
            mirror,
            artifacts,
            model,
            recommendation,
        }
    }

    pub async fn report(&self) -> HealthReport {
        let artifacts = self.artifacts.presence().await;
        let (source_reachable, mirror_reachable) = tokio::join!(
            Self::check(self.source.as_ref()),
            Self::check(self.mirror.as_ref())
        );

        let snapshot = self.model.snapshot();
        let trained = snapshot.is_some();
        let (products, copurchase_edges, similarity_edges) = snapshot
            .as_ref()
            .map(|m| {
                (
                    m.features.len(),
                    m.copurchase.edge_count(),
                    m.similarity.edge_count(),
                )
            })
            .unwrap_or((0, 0, 0));

        let status = if trained && source_reachable && mirror_reachable {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            status,
            trained,
            state: self.model.state(),
            artifacts,
            source_reachable,
            mirror_reachable,
            products,
            copurchase_edges,
            similarity_edges,
            serving: self.recommendation.serving_stats(),
            checked_at: Utc::now(),
        }
    }

    pub async fn model_info(&self) -> ModelInfo {
        let snapshot = self.model.snapshot();
        let (products, copurchase_edges, similarity_edges) = snapshot
            .as_ref()
            .map(|m| {
                (
                    m.features.len(),
                    m.copurchase.edge_count(),
                    m.similarity.edge_count(),
                )
            })
            .unwrap_or((0, 0, 0));

        ModelInfo {
            trained: snapshot.is_some(),
            state: self.model.state(),
            artifacts: self.artifacts.presence().await,
            products,
            copurchase_edges,
            similarity_edges,
            trained_at: snapshot.map(|m| m.trained_at),
        }
    }

    async fn check(store: &dyn Reachable) -> bool {
        matches!(
            tokio::time::timeout(PING_TIMEOUT, store.ping()).await,
            Ok(Ok(()))
        )
    }
}
