use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use immo_predict::app;
use immo_predict::config::Config;
use immo_predict::handlers::AppState;
use immo_predict::pipeline::{self, Pipeline};
use immo_predict::predictor::Predictor;

/// Main entry point for the prediction server.
///
/// Initializes logging, loads configuration and the pipeline artifact, then serves
/// the HTTP API. A missing or incompatible artifact aborts startup before the
/// listener is bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "immo_predict=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load the pipeline once; it is immutable for the life of the process
    let artifact = pipeline::load_artifact(&config.model_path).map_err(|e| {
        tracing::error!("Cannot start without a pipeline: {}", e);
        e
    })?;
    tracing::info!(
        "✓ Pipeline {} loaded from {} (sha256 {})",
        artifact.pipeline.summary().version,
        config.model_path,
        artifact.sha256
    );

    let predictor = Predictor::new(Arc::new(artifact.pipeline), config.inference_concurrency);
    tracing::info!(
        "Inference concurrency: {} simultaneous call(s)",
        predictor.concurrency()
    );

    let app_state = Arc::new(AppState::new(
        config.clone(),
        predictor,
        Some(artifact.sha256),
    ));

    // Configure per-IP rate limiter for the prediction routes
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.replenish_period_ms())
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let api = app::api_routes().layer(ServiceBuilder::new().layer(GovernorLayer {
        config: governor_conf,
    }));
    let router = app::build_router(api, app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("   POST /predict       - Price prediction");
    tracing::info!("   GET  /model-info    - Loaded pipeline");
    tracing::info!("   GET  /health        - Health check");
    tracing::info!("   GET  /docs          - Swagger UI");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
