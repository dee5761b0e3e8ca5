//! Cardiovascular Risk API Server
//!
//! REST API for risk decisions, prediction and alert history, and air-quality
//! readings.

use alerting::AlertPolicy;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use decision_engine::DecisionEngine;
use inference_engine::ModelHandle;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use storage::{Repository, StorageError};
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod settings;

pub use error::{ApiError, ErrorBody};
pub use rate_limit::{create_governor_config, InvalidRateLimit, RateLimitConfig};
pub use settings::{LoggingSettings, Settings, SettingsError};

/// Application state shared across handlers
pub struct AppState {
    /// Per-request decision orchestration
    pub engine: DecisionEngine,
    /// Storage repository
    pub repository: Arc<Repository>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(model: Arc<ModelHandle>, policy: AlertPolicy, repository: Arc<Repository>) -> Self {
        Self {
            engine: DecisionEngine::new(model, policy, Arc::clone(&repository)),
            repository,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build state from settings: loads the model once and opens storage
pub async fn build_state(settings: &Settings) -> Result<AppState, StorageError> {
    let model = Arc::new(ModelHandle::load(&settings.model.path));
    if !model.is_loaded() {
        warn!("Serving without a model; every prediction will be rejected");
    }

    let repository = if settings.database.is_memory() {
        Repository::new()
    } else {
        Repository::with_sqlite(&settings.database.url, settings.database.max_connections).await?
    };

    Ok(AppState::new(
        model,
        AlertPolicy::new(settings.alerting.clone()),
        Arc::new(repository),
    ))
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub inference: ComponentHealth,
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: String,
}

/// Record counts
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub prediction_count: usize,
    pub alert_count: usize,
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/predictions", get(routes::predictions::get_predictions))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/api/v1/aqi", post(routes::aqi::record_aqi))
        .route("/api/v1/aqi/history", get(routes::aqi::get_history))
        .route("/metrics", get(metrics_handler))
}

/// Create the application router without rate limiting
pub fn create_router(state: Arc<AppState>) -> Router {
    api_routes()
        .route("/api/v1/predict", post(routes::predict::predict))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create the application router with the predict endpoint rate limited per
/// client IP.
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_rate_limited_router(
    state: Arc<AppState>,
    config: &RateLimitConfig,
) -> Result<Router, InvalidRateLimit> {
    let governor_config = create_governor_config(config)?;
    let predict = Router::new()
        .route("/api/v1/predict", post(routes::predict::predict))
        .layer(GovernorLayer {
            config: governor_config,
        });

    Ok(api_routes()
        .merge(predict)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state))
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let model = state.engine.model();
    let inference = match model.unavailable_reason() {
        None => ComponentHealth {
            status: "ok".to_string(),
            detail: model.source().to_string(),
        },
        Some(reason) => ComponentHealth {
            status: "unavailable".to_string(),
            detail: reason.to_string(),
        },
    };

    let counts = async {
        Ok::<_, StorageError>((
            state.repository.prediction_count().await?,
            state.repository.alert_count().await?,
        ))
    }
    .await;
    let (database, (prediction_count, alert_count)) = match counts {
        Ok(counts) => (
            ComponentHealth {
                status: "ok".to_string(),
                detail: state.repository.backend_name().to_string(),
            },
            counts,
        ),
        Err(e) => (
            ComponentHealth {
                status: "error".to_string(),
                detail: e.to_string(),
            },
            (0, 0),
        ),
    };

    let healthy = inference.status == "ok" && database.status == "ok";
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            inference,
            database,
        },
        metrics: SystemMetrics {
            prediction_count,
            alert_count,
        },
    };

    Json(response)
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics recorder not installed\n".to_string(),
        ),
    }
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus recorder installed");
    Ok(handle)
}

/// Initialize logging once for the process
pub fn init_logging(config: &LoggingSettings) {
    let level = Level::from_str(config.level.trim()).unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        warn!("Logging was already initialized; keeping the existing subscriber");
    }
}
