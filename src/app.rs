//! HTTP router assembly.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::{ErrorBody, FieldError, FieldIssue};
use crate::handlers::{self, AppState};
use crate::models::{
    Epc, EquippedKitchen, HeatingType, ModelInfo, PredictionResponse, PropertyFeatures, Province,
    SubpropertyType,
};

#[derive(OpenApi)]
#[openapi(
    paths(handlers::predict, handlers::model_info),
    components(schemas(
        PropertyFeatures,
        PredictionResponse,
        ModelInfo,
        ErrorBody,
        FieldError,
        FieldIssue,
        SubpropertyType,
        Province,
        Epc,
        EquippedKitchen,
        HeatingType
    )),
    info(title = "Immo price prediction API")
)]
pub struct ApiDoc;

/// Routes that run user-supplied payloads through the pipeline.
///
/// The binary wraps these in the per-IP rate limiter; `/health` stays outside it.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/model-info", get(handlers::model_info))
}

/// Builds the full application around `api`, usually [`api_routes`] plus middleware.
pub fn build_router(api: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
