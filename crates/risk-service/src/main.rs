//! Risk service - booking cancellation risk scoring over HTTP
//!
//! Loads the model artifact eagerly at startup and refuses to serve if the
//! artifact cannot be brought into service.

use anyhow::{Context, Result};
use risk_core::{
    health::{components, HealthRegistry},
    ModelGateway, RiskPipeline, StructuredLogger,
};
use risk_service::{
    api,
    config::{LogFormat, ServiceConfig},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }
}

async fn shutdown_signal(logger: StructuredLogger) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => logger.log_shutdown("SIGINT received"),
        Err(e) => logger.log_shutdown(&format!("signal handler failed: {}", e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load()?;
    init_tracing(config.log_format);

    info!(
        manifest = %config.manifest_path.display(),
        policy = config.label_policy.as_str(),
        "Starting risk-service"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PIPELINE).await;

    let gateway = Arc::new(ModelGateway::new(config.gateway_config()));
    let pipeline = match RiskPipeline::warm_up(Arc::clone(&gateway), &config.interpreter_config()) {
        Ok(pipeline) => {
            health_registry.record_model_load(Ok(pipeline.model())).await;
            pipeline
        }
        Err(e) => {
            health_registry.record_model_load(Err(&e)).await;
            return Err(e).context("Model artifact could not be brought into service");
        }
    };

    let logger = StructuredLogger::new("risk-service");
    let addr = format!("0.0.0.0:{}", config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    health_registry.register(components::API).await;
    logger.log_startup(SERVICE_VERSION, pipeline.model().version(), &addr);

    let state = Arc::new(api::AppState::new(pipeline, health_registry));
    api::serve(listener, state, shutdown_signal(logger)).await?;

    info!(stats = ?gateway.stats(), "Shut down");
    Ok(())
}
