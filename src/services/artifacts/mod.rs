use crate::error::AppResult;
use crate::models::{ArtifactPresence, ModelArtifact, Product, ProductGraph};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

const COPURCHASE_BLOB: &str = "copurchase_graph.json";
const SIMILARITY_BLOB: &str = "similarity_graph.json";
const FEATURES_BLOB: &str = "product_features.json";

/// One persisted member of the artifact set. All three blobs of a set carry
/// the same training timestamp because they are written by the same run.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    trained_at: DateTime<Utc>,
    data: T,
}

/// Durable storage for the trained bundle: exactly three named blobs,
/// staged to temporary files and renamed over the prior set so no reader
/// ever observes a half-written artifact.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn save(&self, artifact: &ModelArtifact) -> AppResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let blobs = [
            (
                COPURCHASE_BLOB,
                serde_json::to_vec(&Envelope {
                    trained_at: artifact.trained_at,
                    data: &artifact.copurchase,
                })?,
            ),
            (
                SIMILARITY_BLOB,
                serde_json::to_vec(&Envelope {
                    trained_at: artifact.trained_at,
                    data: &artifact.similarity,
                })?,
            ),
            (
                FEATURES_BLOB,
                serde_json::to_vec(&Envelope {
                    trained_at: artifact.trained_at,
                    data: &artifact.features,
                })?,
            ),
        ];

        // stage everything first: a failure here aborts with the prior set intact
        for (name, bytes) in &blobs {
            fs::write(self.staging_path(name), bytes).await?;
        }
        for (name, _) in &blobs {
            fs::rename(self.staging_path(name), self.blob_path(name)).await?;
        }

        info!(dir = %self.dir.display(), "model artifacts saved");
        Ok(())
    }

    /// Load the artifact set. Any missing or undecodable member means the
    /// whole set is treated as untrained; partial state is never returned.
    pub async fn load(&self) -> Option<ModelArtifact> {
        let copurchase: Envelope<ProductGraph> =
            self.read_blob(COPURCHASE_BLOB).await?;
        let similarity: Envelope<ProductGraph> =
            self.read_blob(SIMILARITY_BLOB).await?;
        let features: Envelope<HashMap<i64, Product>> =
            self.read_blob(FEATURES_BLOB).await?;

        Some(ModelArtifact {
            copurchase: copurchase.data,
            similarity: similarity.data,
            features: features.data,
            trained_at: copurchase.trained_at,
        })
    }

    pub async fn presence(&self) -> ArtifactPresence {
        ArtifactPresence {
            copurchase_graph: self.blob_exists(COPURCHASE_BLOB).await,
            similarity_graph: self.blob_exists(SIMILARITY_BLOB).await,
            product_features: self.blob_exists(FEATURES_BLOB).await,
        }
    }

    async fn read_blob<T: DeserializeOwned>(&self, name: &str) -> Option<Envelope<T>> {
        let path = self.blob_path(name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(blob = name, error = %e, "failed to read model artifact");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!(blob = name, error = %e, "failed to decode model artifact");
                None
            }
        }
    }

    async fn blob_exists(&self, name: &str) -> bool {
        fs::metadata(self.blob_path(name)).await.is_ok()
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn staging_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.tmp"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> ModelArtifact {
        let mut copurchase = ProductGraph::new();
        copurchase.insert_symmetric(1, 2, 4.0);
        let mut similarity = ProductGraph::new();
        similarity.insert_symmetric(1, 3, 0.8);

        let mut features = HashMap::new();
        features.insert(
            1,
            Product {
                id: 1,
                name: "phone".to_string(),
                price: 99.0,
                brand: Some("X".to_string()),
                category: Some("phone".to_string()),
                rating: Some(4.5),
                picture: None,
                stock: 3,
            },
        );

        ModelArtifact {
            copurchase: copurchase.finalize(),
            similarity: similarity.finalize(),
            features,
            trained_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let artifact = sample_artifact();
        store.save(&artifact).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.copurchase, artifact.copurchase);
        assert_eq!(loaded.similarity, artifact.similarity);
        assert_eq!(loaded.features.len(), 1);
        assert!(store.presence().await.complete());
    }

    #[tokio::test]
    async fn missing_blob_means_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&sample_artifact()).await.unwrap();

        tokio::fs::remove_file(dir.path().join(SIMILARITY_BLOB))
            .await
            .unwrap();

        assert!(store.load().await.is_none());
        assert!(!store.presence().await.complete());
    }

    #[tokio::test]
    async fn corrupt_blob_means_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&sample_artifact()).await.unwrap();

        tokio::fs::write(dir.path().join(FEATURES_BLOB), b"not json")
            .await
            .unwrap();

        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn empty_dir_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.load().await.is_none());
        assert!(!store.presence().await.complete());
    }
}
