//! HTTP API for risk assessment, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use risk_core::{
    health::{ComponentStatus, HealthRegistry},
    FailureKind, PipelineError, PredictionResult, RawBooking, RiskPipeline,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: RiskPipeline,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(pipeline: RiskPipeline, health_registry: HealthRegistry) -> Self {
        Self {
            pipeline,
            health_registry,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub summary: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_version: String,
    pub format: &'static str,
    pub checksum: String,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub policy: &'static str,
    pub threshold: f64,
}

/// Error body for failed assessments
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Maps pipeline failures onto HTTP responses
pub struct ApiError(PipelineError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let (status, code) = match error.kind() {
            FailureKind::InvalidInput => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
            FailureKind::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            FailureKind::Unexpected => {
                error!(error = %error, "Unexpected assessment failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "unexpected")
            }
        };

        let body = ErrorBody {
            error: code,
            message: error.user_message(),
            field: error.validation().map(|v| v.field.clone()),
            reason: error.validation().map(|v| v.reason.code()),
        };
        (status, Json(body)).into_response()
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawBooking>,
) -> Result<Json<PredictResponse>, ApiError> {
    let result = state
        .pipeline
        .assess_with_timeout(&raw)
        .await
        .map_err(ApiError)?;

    Ok(Json(PredictResponse {
        summary: result.label.summary(),
        result,
    }))
}

async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let model = state.pipeline.model();
    let interpreter = state.pipeline.interpreter();
    Json(ModelInfo {
        model_version: model.version().to_string(),
        format: model.format().as_str(),
        checksum: model.checksum().to_string(),
        feature_count: model.encoder().width(),
        feature_names: model.encoder().feature_names().to_vec(),
        policy: interpreter.policy().as_str(),
        threshold: interpreter.threshold(),
    })
}

/// Returns 200 while operational, 503 when a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/predict", post(predict))
        .route("/v1/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    info!(addr = %listener.local_addr()?, "Starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
