use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{ModelArtifact, ModelHandle, Recommendation};
use crate::services::source::SourceStore;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Answers per-product similarity and co-purchase queries from the current
/// model snapshot, or from live catalog queries when the model has nothing
/// to say. Model unavailability is not an error; it selects the fallback.
pub struct RecommendationService {
    model: Arc<ModelHandle>,
    source: Arc<SourceStore>,
    config: Arc<Config>,
    stats: DashMap<String, u64>,
}

impl RecommendationService {
    pub fn new(model: Arc<ModelHandle>, source: Arc<SourceStore>, config: Arc<Config>) -> Self {
        Self {
            model,
            source,
            config,
            stats: DashMap::new(),
        }
    }

    pub async fn get_similar(
        &self,
        product_id: i64,
        limit: Option<usize>,
    ) -> AppResult<Vec<Recommendation>> {
        let limit = self.validate_limit(limit)?;
        self.bump("similar_requests");

        if let Some(model) = self.model.snapshot() {
            if let Some(recommendations) = rank_similar(&model, product_id, limit) {
                if !recommendations.is_empty() {
                    return Ok(recommendations);
                }
            }
        }

        self.bump("similar_fallbacks");
        self.fallback_similar(product_id, limit).await
    }

    pub async fn get_copurchased(
        &self,
        product_id: i64,
        limit: Option<usize>,
    ) -> AppResult<Vec<Recommendation>> {
        let limit = self.validate_limit(limit)?;
        self.bump("copurchase_requests");

        if let Some(model) = self.model.snapshot() {
            if let Some(recommendations) = rank_copurchased(&model, product_id, limit) {
                if !recommendations.is_empty() {
                    return Ok(recommendations);
                }
            }
        }

        self.bump("copurchase_fallbacks");
        self.fallback_copurchased(product_id, limit).await
    }

    pub fn serving_stats(&self) -> HashMap<String, u64> {
        self.stats
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Rejected before any model or store access.
    fn validate_limit(&self, limit: Option<usize>) -> AppResult<usize> {
        let max = self.config.recommendation.max_limit;
        let limit = limit.unwrap_or(self.config.recommendation.default_limit);
        if limit == 0 || limit > max {
            return Err(AppError::InvalidRequest(format!(
                "limit must be between 1 and {max}"
            )));
        }
        Ok(limit)
    }

    async fn fallback_similar(
        &self,
        product_id: i64,
        limit: usize,
    ) -> AppResult<Vec<Recommendation>> {
        let anchor = self
            .source
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;

        let score = self.config.recommendation.fallback_similar_score;
        let recommendations: Vec<Recommendation> = self
            .source
            .similar_by_category(anchor.category.as_deref(), product_id, limit as i64)
            .await?
            .iter()
            .map(|p| {
                Recommendation::from_product(p, score, format!("Same category as {}", anchor.name))
            })
            .collect();

        if recommendations.is_empty() {
            return Err(AppError::NotFound(format!(
                "no similar products found for product {product_id}"
            )));
        }

        info!(product_id, count = recommendations.len(), "served similar products via live fallback");
        Ok(recommendations)
    }

    async fn fallback_copurchased(
        &self,
        product_id: i64,
        limit: usize,
    ) -> AppResult<Vec<Recommendation>> {
        self.source
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;

        let score = self.config.recommendation.fallback_copurchase_score;
        let recommendations: Vec<Recommendation> = self
            .source
            .copurchased_with(product_id, limit as i64)
            .await?
            .iter()
            .map(|(p, count)| {
                Recommendation::from_product(p, score, format!("Often bought together ({count} times)"))
            })
            .collect();

        if recommendations.is_empty() {
            return Err(AppError::NotFound(format!(
                "no co-purchase recommendations found for product {product_id}"
            )));
        }

        info!(product_id, count = recommendations.len(), "served co-purchases via live fallback");
        Ok(recommendations)
    }

    fn bump(&self, key: &str) {
        *self.stats.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// Serve from the similarity graph. `None` means the model has no entries
/// for this product and the caller should fall back.
pub fn rank_similar(
    model: &ModelArtifact,
    product_id: i64,
    limit: usize,
) -> Option<Vec<Recommendation>> {
    let neighbors = model.similarity.neighbors(product_id)?;

    let recommendations = neighbors
        .iter()
        .take(limit)
        .filter_map(|n| {
            model.features.get(&n.product_id).map(|product| {
                Recommendation::from_product(
                    product,
                    n.score,
                    format!(
                        "Similar to your selected product (similarity: {:.2})",
                        n.score
                    ),
                )
            })
        })
        .collect();
    Some(recommendations)
}

/// Serve from the co-purchase graph. Scores are normalized against the
/// product's strongest neighbor; the reason cites the raw weight.
pub fn rank_copurchased(
    model: &ModelArtifact,
    product_id: i64,
    limit: usize,
) -> Option<Vec<Recommendation>> {
    let neighbors = model.copurchase.neighbors(product_id)?;
    // adjacency lists are sorted descending, so the head carries the max
    let max_weight = neighbors.first().map(|n| n.score).unwrap_or(1.0);

    let recommendations = neighbors
        .iter()
        .take(limit)
        .filter_map(|n| {
            model.features.get(&n.product_id).map(|product| {
                Recommendation::from_product(
                    product,
                    n.score / max_weight,
                    format!("Frequently bought together (weight: {:.1})", n.score),
                )
            })
        })
        .collect();
    Some(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, ProductGraph};
    use chrono::Utc;

    fn product(id: i64) -> Product {
        Product {
            id,
            name: format!("product-{id}"),
            price: 10.0 * id as f64,
            brand: Some("X".to_string()),
            category: Some("phone".to_string()),
            rating: Some(4.0),
            picture: None,
            stock: 5,
        }
    }

    fn model() -> ModelArtifact {
        let mut similarity = ProductGraph::new();
        similarity.insert_symmetric(1, 2, 0.9);
        similarity.insert_symmetric(1, 3, 0.5);
        similarity.insert_symmetric(1, 4, 0.4);

        let mut copurchase = ProductGraph::new();
        copurchase.insert_symmetric(1, 2, 6.0);
        copurchase.insert_symmetric(1, 3, 3.0);

        let features = [1, 2, 3, 4].iter().map(|&id| (id, product(id))).collect();

        ModelArtifact {
            copurchase: copurchase.finalize(),
            similarity: similarity.finalize(),
            features,
            trained_at: Utc::now(),
        }
    }

    #[test]
    fn rank_similar_sorts_and_truncates() {
        let model = model();
        let recommendations = rank_similar(&model, 1, 2).unwrap();

        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].product_id, 2);
        assert_eq!(recommendations[1].product_id, 3);
        assert!(recommendations[0].score >= recommendations[1].score);
    }

    #[test]
    fn rank_similar_excludes_self() {
        let model = model();
        let recommendations = rank_similar(&model, 1, 10).unwrap();
        assert!(recommendations.iter().all(|r| r.product_id != 1));
    }

    #[test]
    fn rank_similar_misses_unknown_product() {
        let model = model();
        assert!(rank_similar(&model, 99, 5).is_none());
    }

    #[test]
    fn rank_copurchased_normalizes_scores() {
        let model = model();
        let recommendations = rank_copurchased(&model, 1, 10).unwrap();

        assert_eq!(recommendations[0].product_id, 2);
        assert!((recommendations[0].score - 1.0).abs() < 1e-6);
        assert!((recommendations[1].score - 0.5).abs() < 1e-6);
        assert!(recommendations[0].reason.contains("6.0"));
    }

    #[test]
    fn rank_skips_products_missing_from_features() {
        let mut model = model();
        model.features.remove(&3);

        let recommendations = rank_similar(&model, 1, 10).unwrap();
        assert!(recommendations.iter().all(|r| r.product_id != 3));
    }
}
