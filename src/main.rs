use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use shoprec::{init_tracing, AppError, AppState, Config};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }
}

async fn get_similar(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<shoprec::Recommendation>>>, AppError> {
    let recommendations = state
        .recommendation
        .get_similar(product_id, params.limit)
        .await?;
    Ok(Json(ApiResponse::success(recommendations)))
}

async fn get_copurchased(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<shoprec::Recommendation>>>, AppError> {
    let recommendations = state
        .recommendation
        .get_copurchased(product_id, params.limit)
        .await?;
    Ok(Json(ApiResponse::success(recommendations)))
}

async fn run_sync(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<shoprec::SyncReport>>, AppError> {
    let report = state.syncer.sync().await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn run_train(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<shoprec::TrainingReport>>, AppError> {
    let report = state.training.train().await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn run_full_retrain(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<shoprec::RetrainReport>>, AppError> {
    let report = state.training.full_retrain().await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<shoprec::HealthReport>> {
    let report = state.health.report().await;
    Json(ApiResponse::success(report))
}

async fn model_info(State(state): State<AppState>) -> Json<ApiResponse<shoprec::ModelInfo>> {
    let info = state.health.model_info().await;
    Json(ApiResponse::success(info))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/similar/:product_id", get(get_similar))
        .route("/copurchase/:product_id", get(get_copurchased))
        .route("/sync", post(run_sync))
        .route("/train", post(run_train))
        .route("/full-retrain", post(run_full_retrain))
        .route("/models/info", get(model_info))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().await;

    let config_path = "config/default.toml";
    let config = if std::path::Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        info!("config file not found, using default configuration");
        Config::default()
    };

    info!("starting shoprec recommendation server with config: {:?}", config.server);

    let state = AppState::new(config.clone()).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    info!("server listening on {}", config.server.socket_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
