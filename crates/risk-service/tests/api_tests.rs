//! Integration tests for the risk service API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use risk_core::{
    health::{components, HealthRegistry},
    predictor::{ArtifactFormat, Classifier, ModelManifest},
    GatewayConfig, InterpreterConfig, LoadedModel, ModelGateway, PredictError, RawScore,
    RiskPipeline,
};
use risk_service::api::{create_router, AppState};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn bundled_manifest() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/booking-cancellation/manifest.json")
}

fn booking() -> Value {
    json!({
        "hotel": "Resort Hotel",
        "lead_time": 300,
        "meal": "HB",
        "market_segment": "Online TA",
        "distribution_channel": "TA/TO",
        "is_repeated_guest": 0,
        "previous_cancellations": 5,
        "previous_bookings_not_canceled": 0,
        "reserved_room_type": "D",
        "assigned_room_type": "D",
        "booking_changes": 0,
        "deposit_type": "No Deposit",
        "days_in_waiting_list": 0,
        "customer_type": "Transient",
        "adr": 120.5,
        "required_car_parking_spaces": 0,
        "total_of_special_requests": 0,
        "total_stays": 4,
        "total_guests": 2,
        "has_agent": 1,
        "has_company": 0,
        "arrival_month_num": 8
    })
}

async fn setup_test_app(pipeline: RiskPipeline) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::PIPELINE).await;
    health_registry.register(components::API).await;
    health_registry.record_model_load(Ok(pipeline.model())).await;

    let state = Arc::new(AppState::new(pipeline, health_registry));
    (create_router(state.clone()), state)
}

fn bundled_pipeline() -> RiskPipeline {
    let gateway = Arc::new(ModelGateway::new(GatewayConfig::new(bundled_manifest())));
    RiskPipeline::warm_up(gateway, &InterpreterConfig::default()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_predict_returns_result() {
    let (app, _state) = setup_test_app(bundled_pipeline()).await;

    let (status, body) = send(app, post_json("/v1/predict", &booking())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "cancelled");
    assert_eq!(body["policy"], "threshold");
    assert_eq!(body["model_version"], "2024.06-logreg");
    assert_eq!(body["summary"], "High risk: booking likely to be cancelled");
    let probability = body["probability"].as_f64().unwrap();
    let complement = body["complement"].as_f64().unwrap();
    assert!((probability + complement - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_predict_rejects_missing_field() {
    let (app, _state) = setup_test_app(bundled_pipeline()).await;
    let mut booking = booking();
    booking.as_object_mut().unwrap().remove("adr");

    let (status, body) = send(app, post_json("/v1/predict", &booking)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(body["field"], "adr");
    assert_eq!(body["reason"], "missing");
    assert!(body["message"].as_str().unwrap().contains("adr"));
}

#[tokio::test]
async fn test_predict_rejects_out_of_domain_value() {
    let (app, _state) = setup_test_app(bundled_pipeline()).await;
    let mut booking = booking();
    booking["meal"] = json!("Undefined");

    let (status, body) = send(app, post_json("/v1/predict", &booking)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "meal");
    assert_eq!(body["reason"], "not_in_domain");
}

#[tokio::test]
async fn test_predict_rejects_non_object_body() {
    let (app, _state) = setup_test_app(bundled_pipeline()).await;

    let (status, _body) = send(app, post_json("/v1/predict", &json!([1, 2, 3]))).await;

    assert!(status.is_client_error());
}

/// Classifier that never answers within the test's budget
struct StalledClassifier {
    width: usize,
}

impl Classifier for StalledClassifier {
    fn score(&self, _features: &[f32]) -> Result<RawScore, PredictError> {
        std::thread::sleep(Duration::from_millis(150));
        Ok(RawScore {
            label: None,
            probability: 0.5,
        })
    }

    fn input_width(&self) -> usize {
        self.width
    }

    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Logistic
    }
}

#[tokio::test]
async fn test_predict_timeout_is_service_unavailable() {
    let manifest = ModelManifest::from_path(&bundled_manifest()).unwrap();
    let classifier = StalledClassifier {
        width: manifest.encoded_width(),
    };
    let model = LoadedModel::new(manifest, Box::new(classifier), "stalled").unwrap();
    let config = GatewayConfig::new(bundled_manifest()).with_timeout(Duration::from_millis(10));
    let gateway = Arc::new(ModelGateway::from_loaded(model, config));
    let pipeline = RiskPipeline::warm_up(gateway, &InterpreterConfig::default()).unwrap();
    let (app, _state) = setup_test_app(pipeline).await;

    let (status, body) = send(app, post_json("/v1/predict", &booking())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "unavailable");
    assert!(body.get("field").is_none());
}

#[tokio::test]
async fn test_model_info() {
    let (app, _state) = setup_test_app(bundled_pipeline()).await;

    let (status, body) = send(app, get("/v1/model")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_version"], "2024.06-logreg");
    assert_eq!(body["format"], "logistic");
    assert_eq!(body["feature_count"], 54);
    assert_eq!(body["feature_names"].as_array().unwrap().len(), 54);
    assert_eq!(body["policy"], "auto");
    assert_eq!(body["threshold"], 0.5);
}

#[tokio::test]
async fn test_healthz_and_readyz_when_serving() {
    let (app, _state) = setup_test_app(bundled_pipeline()).await;

    let (status, health) = send(app.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"]["model_gateway"]["status"], "healthy");

    let (status, readiness) = send(app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app(bundled_pipeline()).await;
    state
        .health_registry
        .set_degraded(components::PIPELINE, "Slow inferences")
        .await;

    let (status, health) = send(app, get("/healthz")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_health_endpoints_503_when_unhealthy() {
    let (app, state) = setup_test_app(bundled_pipeline()).await;
    state
        .health_registry
        .set_unhealthy(components::API, "Listener closed")
        .await;

    let (status, health) = send(app.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");

    let (status, readiness) = send(app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_predictions() {
    let (app, _state) = setup_test_app(bundled_pipeline()).await;
    let (status, _) = send(app.clone(), post_json("/v1/predict", &booking())).await;
    assert_eq!(status, StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("booking_risk_predictions_total"));
    assert!(text.contains("booking_risk_prediction_latency_seconds"));
    assert!(text.contains("booking_risk_model_version_info"));
}
