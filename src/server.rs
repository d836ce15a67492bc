use crate::config::AppConfig;
use crate::dashboard::{Dashboard, DensityView, DetailView, NeighborhoodView, PageView};
use crate::data::PubStore;
use crate::types::PubRecord;
use anyhow::{Context, Result};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct AppState {
    pub dashboard: Dashboard,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pubs: Vec<String>,
}

#[derive(Deserialize)]
pub struct DetailParams {
    name: String,
}

#[derive(Deserialize)]
pub struct SampleParams {
    rows: Option<usize>,
}

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/page", get(page_handler))
        .route("/api/density", get(density_handler))
        .route("/api/neighborhoods", post(neighborhoods_handler))
        .route("/api/detail", get(detail_handler))
        .route("/api/sample", get(sample_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, store: PubStore) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", config.server.host, config.server.port))?;
    let static_dir = config.server.static_dir.clone();

    let state = Arc::new(AppState {
        dashboard: Dashboard::new(Arc::new(store), config),
    });
    let app = router(state, &static_dir);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn page_handler(State(state): State<Arc<AppState>>) -> Json<PageView> {
    Json(state.dashboard.page())
}

async fn density_handler(State(state): State<Arc<AppState>>) -> Json<DensityView> {
    Json(state.dashboard.density().clone())
}

async fn neighborhoods_handler(
    State(state): State<Arc<AppState>>,
    request: Result<Json<FilterRequest>, JsonRejection>,
) -> Result<Json<NeighborhoodView>, ApiError> {
    let Json(request) = request?;
    Ok(Json(state.dashboard.set_filter(request.pubs.as_slice())?))
}

async fn detail_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<DetailParams>, QueryRejection>,
) -> Result<Json<DetailView>, ApiError> {
    let Query(params) = params?;
    Ok(Json(state.dashboard.select_pub(&params.name)))
}

async fn sample_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SampleParams>, QueryRejection>,
) -> Result<Json<Vec<PubRecord>>, ApiError> {
    let Query(params) = params?;
    let rows = state.dashboard.sample(params.rows)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(rows.into_iter().cloned().collect()))
}
