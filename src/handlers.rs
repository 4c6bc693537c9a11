use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ModelInfo, PredictionResponse};
use crate::predictor::Predictor;
use crate::validation::validate_payload;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Scores validated listings with the pipeline loaded at startup.
    pub predictor: Predictor,
    /// Description of the loaded pipeline.
    pub model_info: ModelInfo,
}

impl AppState {
    pub fn new(config: Config, predictor: Predictor, sha256: Option<String>) -> Self {
        let summary = predictor.pipeline().summary();
        let model_info = ModelInfo {
            version: summary.version,
            producer: summary.producer,
            regressor: summary.regressor,
            sha256,
            loaded_at: chrono::Utc::now(),
            input_columns: predictor.pipeline().feature_names_in().to_vec(),
            inference_concurrency: predictor.concurrency(),
        };
        Self {
            config,
            predictor,
            model_info,
        }
    }
}

/// Health check endpoint.
///
/// Only reachable once the pipeline is loaded, so a 200 here means the service can
/// predict.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "immo-predict",
            "version": env!("CARGO_PKG_VERSION"),
            "model_version": state.model_info.version,
        })),
    )
}

/// GET /model-info
#[utoipa::path(
    get,
    path = "/model-info",
    responses((status = 200, description = "Loaded pipeline", body = ModelInfo))
)]
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    Json(state.model_info.clone())
}

/// POST /predict
///
/// Validates the fourteen listing attributes, materializes them into the named
/// feature row and returns the pipeline's price estimate.
///
/// # Returns
///
/// * `200` with `{"predicted_price": f64}`.
/// * `422` listing every invalid field.
/// * `400` when the body is not JSON.
/// * `500` when the pipeline fails.
#[utoipa::path(
    post,
    path = "/predict",
    request_body = PropertyFeatures,
    responses(
        (status = 200, description = "Price estimate", body = PredictionResponse),
        (status = 400, description = "Body is not JSON", body = ErrorBody),
        (status = 422, description = "Invalid fields", body = ErrorBody),
        (status = 500, description = "Pipeline failure", body = ErrorBody)
    )
)]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let span = tracing::info_span!("prediction", prediction_id = %Uuid::new_v4());
    async move {
        let features = validate_payload(&payload).map_err(|e| {
            tracing::warn!("Rejected prediction request: {}", e);
            AppError::Validation(e)
        })?;

        let predicted_price = state
            .predictor
            .predict(&features)
            .await
            .map_err(AppError::Prediction)?;

        tracing::info!(
            "Predicted {:.0} EUR for {} in {}",
            predicted_price,
            features.subproperty_type,
            features.province
        );

        Ok(Json(PredictionResponse { predicted_price }))
    }
    .instrument(span)
    .await
}
