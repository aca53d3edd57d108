pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::*;

use services::{
    artifacts::ArtifactStore, health::HealthService, mirror::MirrorStore,
    recommendation::RecommendationService, source::SourceStore, sync::DataSyncer,
    training::TrainingService,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub source: Arc<SourceStore>,
    pub mirror: Arc<MirrorStore>,
    pub syncer: Arc<DataSyncer>,
    pub artifacts: Arc<ArtifactStore>,
    pub model: Arc<ModelHandle>,
    pub recommendation: Arc<RecommendationService>,
    pub training: Arc<TrainingService>,
    pub health: Arc<HealthService>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let config = Arc::new(config);

        let source = Arc::new(SourceStore::new(&config.source)?);
        let mirror = Arc::new(MirrorStore::new(&config.mirror)?);
        let syncer = Arc::new(DataSyncer::new(source.clone(), mirror.clone()));
        let artifacts = Arc::new(ArtifactStore::new(config.artifacts.dir.clone()));

        let model = Arc::new(ModelHandle::new());
        match artifacts.load().await {
            Some(artifact) => {
                info!(trained_at = %artifact.trained_at, "model artifacts loaded");
                model.install(Arc::new(artifact));
            }
            None => {
                warn!("no trained model artifacts found, serving will use fallbacks");
            }
        }

        let recommendation = Arc::new(RecommendationService::new(
            model.clone(),
            source.clone(),
            config.clone(),
        ));

        let training = Arc::new(TrainingService::new(
            mirror.clone(),
            syncer.clone(),
            artifacts.clone(),
            model.clone(),
            config.clone(),
        ));

        let health = Arc::new(HealthService::new(
            source.clone(),
            mirror.clone(),
            artifacts.clone(),
            model.clone(),
            recommendation.clone(),
        ));

        Ok(Self {
            config,
            source,
            mirror,
            syncer,
            artifacts,
            model,
            recommendation,
            training,
            health,
        })
    }
}

pub async fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
