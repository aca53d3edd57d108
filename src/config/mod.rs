use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub source: DatabaseConfig,
    pub mirror: DatabaseConfig,
    pub artifacts: ArtifactConfig,
    pub training: TrainingConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().unwrap()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub latent_dim: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub regularization: f32,
    pub seed: u64,
    /// Minimum embedding cosine similarity for a learned co-purchase edge.
    pub copurchase_threshold: f32,
    /// Fixed factor applied to learned similarities so their weights stay
    /// comparable to the fallback's raw co-occurrence counts.
    pub copurchase_scale: f32,
    /// Minimum same-order occurrences for a fallback co-purchase edge.
    pub min_cooccurrence: u32,
    /// Minimum feature-vector cosine similarity for a similarity edge.
    pub similarity_threshold: f32,
    pub max_components: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub fallback_similar_score: f32,
    pub fallback_copurchase_score: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            source: DatabaseConfig {
                url: "postgresql://localhost:5432/shop".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 30,
            },
            mirror: DatabaseConfig {
                url: "postgresql://localhost:5432/shop_analytics".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 30,
            },
            artifacts: ArtifactConfig {
                dir: "models".to_string(),
            },
            training: TrainingConfig {
                latent_dim: 10,
                epochs: 100,
                learning_rate: 0.01,
                regularization: 0.01,
                seed: 42,
                copurchase_threshold: 0.2,
                copurchase_scale: 10.0,
                min_cooccurrence: 2,
                similarity_threshold: 0.3,
                max_components: 10,
            },
            recommendation: RecommendationConfig {
                default_limit: 10,
                max_limit: 50,
                fallback_similar_score: 0.6,
                fallback_copurchase_score: 0.7,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SHOPREC"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
