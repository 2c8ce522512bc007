/// API сервер прогноза энергопотребления

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::EnergyError;
use crate::inference::EnergyPredictor;
use crate::types::{ModelInfo, PredictionOutput, RawRecord};

/// Предиктор неизменяем после загрузки, блокировки не нужны.
/// None - обучение не удалось, сервис не инициализирован.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Option<Arc<EnergyPredictor>>,
}

impl AppState {
    pub fn new(predictor: Option<EnergyPredictor>) -> Self {
        Self {
            predictor: predictor.map(Arc::new),
        }
    }
}

type ApiError = (StatusCode, String);

pub fn router(state: AppState) -> Router {
    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/model", get(model_info))
        .route("/api/predict", post(predict))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Energy ML API (Rust)",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = match &state.predictor {
        Some(p) if p.model().is_some() => "ok",
        Some(_) => "no_model",
        None => "uninitialized",
    };
    Json(serde_json::json!({ "status": status }))
}

async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>, ApiError> {
    let predictor = initialized(&state)?;
    Ok(Json(predictor.model_info()))
}

async fn predict(
    State(state): State<AppState>,
    Json(reading): Json<RawRecord>,
) -> Result<Json<PredictionOutput>, ApiError> {
    let predictor = initialized(&state)?;
    tracing::info!("Predict request: {} fields", reading.len());

    let predictor = Arc::clone(predictor);
    let output = tokio::task::spawn_blocking(move || predictor.predict_output(&reading))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Prediction task failed: {}", e)))?;

    match output {
        Ok(output) => Ok(Json(output)),
        Err(e @ EnergyError::SchemaMismatch { .. }) => {
            Err((StatusCode::UNPROCESSABLE_ENTITY, format!("Prediction error: {}", e)))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, format!("Prediction error: {}", e))),
    }
}

fn initialized(state: &AppState) -> Result<&Arc<EnergyPredictor>, ApiError> {
    state.predictor.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Model is not initialized".to_string(),
        )
    })
}
