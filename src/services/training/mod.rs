use crate::algorithms::{ContentSimilarityTrainer, CoPurchaseTrainer};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{ModelArtifact, ModelHandle, ModelState, RetrainReport, TrainingReport};
use crate::services::{artifacts::ArtifactStore, mirror::MirrorStore, sync::DataSyncer};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Runs the batch training workflow: read the mirror, build both graphs,
/// persist the artifact set, swap the serving handle. One run at a time; a
/// trigger arriving while a run is active is rejected, not queued.
pub struct TrainingService {
    mirror: Arc<MirrorStore>,
    syncer: Arc<DataSyncer>,
    artifacts: Arc<ArtifactStore>,
    model: Arc<ModelHandle>,
    config: Arc<Config>,
    run_slot: Mutex<()>,
}

impl TrainingService {
    pub fn new(
        mirror: Arc<MirrorStore>,
        syncer: Arc<DataSyncer>,
        artifacts: Arc<ArtifactStore>,
        model: Arc<ModelHandle>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            mirror,
            syncer,
            artifacts,
            model,
            config,
            run_slot: Mutex::new(()),
        }
    }

    pub async fn train(&self) -> AppResult<TrainingReport> {
        let _guard = self
            .run_slot
            .try_lock()
            .map_err(|_| AppError::TrainingInProgress)?;
        self.train_locked().await
    }

    /// Sync then train. Holds the run slot across both phases and aborts
    /// before training if the sync fails.
    pub async fn full_retrain(&self) -> AppResult<RetrainReport> {
        let _guard = self
            .run_slot
            .try_lock()
            .map_err(|_| AppError::TrainingInProgress)?;

        let sync = self.syncer.sync().await?;
        let training = self.train_locked().await?;
        Ok(RetrainReport { sync, training })
    }

    async fn train_locked(&self) -> AppResult<TrainingReport> {
        let previous = self.model.state();
        self.model.set_state(ModelState::Training);

        match self.run_training().await {
            Ok(report) => Ok(report),
            Err(e) => {
                // the previously loaded artifact keeps serving
                self.model.set_state(previous);
                error!(error = %e, "model training failed, prior artifact retained");
                Err(e)
            }
        }
    }

    async fn run_training(&self) -> AppResult<TrainingReport> {
        let started = Instant::now();
        info!("starting model training");

        let products = self.mirror.load_products().await?;
        let interactions = self.mirror.load_interactions().await?;
        let baskets = self.mirror.load_baskets().await?;

        let copurchase =
            CoPurchaseTrainer::new(&self.config.training).train(&interactions, &baskets);
        let similarity = ContentSimilarityTrainer::new(&self.config.training).train(&products);

        let features: HashMap<_, _> = products.into_iter().map(|p| (p.id, p)).collect();
        let artifact = ModelArtifact {
            copurchase,
            similarity,
            features,
            trained_at: Utc::now(),
        };

        self.artifacts.save(&artifact).await?;

        let report = TrainingReport {
            duration_ms: started.elapsed().as_millis() as u64,
            products: artifact.features.len(),
            copurchase_edges: artifact.copurchase.edge_count(),
            similarity_edges: artifact.similarity.edge_count(),
            trained_at: artifact.trained_at,
        };

        self.model.install(Arc::new(artifact));

        info!(
            duration_ms = report.duration_ms,
            products = report.products,
            copurchase_edges = report.copurchase_edges,
            similarity_edges = report.similarity_edges,
            "model training completed"
        );
        Ok(report)
    }
}
