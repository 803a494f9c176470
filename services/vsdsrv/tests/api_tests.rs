//! HTTP surface tests driven through the router with `oneshot`

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use vsdsrv::test_utils::{MockDevice, Op};

use common::{field_device, router};

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

async fn connected(device: &MockDevice) -> Router {
    let (app, _) = router(device);
    let (status, _) = post(&app, "/api/connect", json!({"port": "/dev/ttyMOCK0"})).await;
    assert_eq!(status, StatusCode::OK);
    app
}

#[tokio::test]
async fn test_health() {
    let (app, _) = router(&MockDevice::new());
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["service"], "vsdsrv");
}

#[tokio::test]
async fn test_status_reflects_session() {
    let device = field_device();
    let (app, _) = router(&device);
    let (_, body) = get(&app, "/api/status").await;
    assert_eq!(body["data"]["instrument"]["connected"], false);

    post(&app, "/api/connect", json!({"port": "/dev/ttyMOCK0"})).await;
    let (_, body) = get(&app, "/api/status").await;
    let inst = &body["data"]["instrument"];
    assert_eq!(inst["connected"], true);
    assert_eq!(inst["transport"], "serial");
    assert_eq!(inst["addressing"], "slave");
    assert_eq!(inst["device_id"], 1);
}

#[tokio::test]
async fn test_register_listing() {
    let (app, _) = router(&MockDevice::new());
    let (status, body) = get(&app, "/api/registers").await;
    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 30);

    let target = list.iter().find(|r| r["id"] == "vsd_target_freq").unwrap();
    assert_eq!(target["address"], 855);
    assert_eq!(target["type"], "uint16");
    assert_eq!(target["scale"], 100);
    assert_eq!(target["decimals"], 2);
    assert_eq!(target["unit"], "Hz");
    assert_eq!(target["access"], "read-write");
}

#[tokio::test]
async fn test_connect_errors() {
    let (app, _) = router(&field_device());

    let (status, body) = post(&app, "/api/connect", json!({"transport": "serial"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"]["details"]
        .as_str()
        .unwrap()
        .contains("VSD_CONFIGURATION"));

    let (status, _) = post(&app, "/api/connect", json!({"transport": "usb"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (app, _) = router(&MockDevice::new().silent());
    let (status, body) = post(&app, "/api/connect", json!({"port": "/dev/ttyMOCK0"})).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["code"], 504);

    let (app, _) = router(&MockDevice::new().unreachable());
    let (status, _) = post(
        &app,
        "/api/connect",
        json!({"transport": "tcp", "host": "10.0.0.9"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_connect_accepts_legacy_field_names() {
    let device = field_device();
    let (app, _) = router(&device);
    let (status, body) = post(
        &app,
        "/api/connect",
        json!({
            "connection_type": "tcp",
            "ip_address": "192.168.1.50",
            "tcp_port": 5020,
            "slave_id": 7
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"]["endpoint"], "192.168.1.50:5020");
    assert_eq!(body["data"]["status"]["device_id"], 7);
    assert_eq!(device.last_device().unwrap().id, 7);
}

#[tokio::test]
async fn test_read() {
    let (app, _) = router(&field_device());
    let (status, body) = get(&app, "/api/read/vsd_target_freq").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]["details"]
        .as_str()
        .unwrap()
        .contains("VSD_NOT_CONNECTED"));

    let app = connected(&field_device()).await;
    let (status, body) = get(&app, "/api/read/vsd_target_freq").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "vsd_target_freq");
    assert_eq!(body["data"]["value"], 60.0);
    assert_eq!(body["data"]["unit"], "Hz");

    let (_, body) = get(&app, "/api/read/vsd_motor_rpm").await;
    assert_eq!(body["data"]["value"], 3450);

    let (status, _) = get(&app, "/api/read/no_such_point").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_write() {
    let device = field_device();
    let app = connected(&device).await;
    device.clear_ops();

    let (status, body) = post(
        &app,
        "/api/write",
        json!({"id": "vsd_target_freq", "value": 60.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "vsd_target_freq");
    assert_eq!(body["data"]["raw"], 6000);
    assert_eq!(device.holding(855), Some(6000));

    // Numeric strings are accepted
    let (status, body) = post(
        &app,
        "/api/write",
        json!({"id": "vsd_max_speed", "value": "65.5"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["raw"], 6550);

    let (status, _) = post(
        &app,
        "/api/write",
        json!({"id": "vsd_target_freq", "value": "fast"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let writes_before = device.ops().len();
    let (status, body) = post(&app, "/api/write", json!({"id": "vsd_current", "value": 1})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"]["details"]
        .as_str()
        .unwrap()
        .contains("VSD_ACCESS_DENIED"));
    assert_eq!(device.ops().len(), writes_before);
}

#[tokio::test]
async fn test_write_malformed_body_is_bad_request() {
    let device = field_device();
    let app = connected(&device).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/write")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_read_batch() {
    let device = field_device().failing_at(2136);
    let app = connected(&device).await;

    let (status, body) = post(
        &app,
        "/api/read_batch",
        json!({"ids": ["vsd_current", "dht_intake_pressure"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["vsd_current"], 42.5);
    assert!(body["data"]["dht_intake_pressure"].is_null());

    let (status, body) = post(&app, "/api/read_batch", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({}));

    device.set_silent(true);
    let (status, body) = post(
        &app,
        "/api/read_batch",
        json!({"ids": ["vsd_current", "vsd_motor_current"]}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"]["details"]
        .as_str()
        .unwrap()
        .contains("reconnect: true"));
}

#[tokio::test]
async fn test_read_batch_uses_one_transaction_per_id() {
    let device = field_device();
    let app = connected(&device).await;
    device.clear_ops();

    post(
        &app,
        "/api/read_batch",
        json!({"ids": ["vsd_current", "vsd_motor_current", "vsd_motor_rpm"]}),
    )
    .await;
    let reads = device
        .ops()
        .into_iter()
        .filter(|op| matches!(op, Op::ReadHolding { count: 1, .. }))
        .count();
    assert_eq!(reads, 3);
}

#[tokio::test]
async fn test_site_name() {
    let device = field_device();
    let app = connected(&device).await;

    let (status, body) = post(&app, "/api/site_name", json!({"name": "WELL-17B"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "WELL-17B");

    let (_, body) = get(&app, "/api/site_name").await;
    assert_eq!(body["data"]["name"], "WELL-17B");

    let (_, body) = post(&app, "/api/site_name", json!({"name": "NORTH-FIELD-22"})).await;
    assert_eq!(body["data"]["name"], "NORTH-FIEL");
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let app = connected(&field_device()).await;
    let (status, _) = post(&app, "/api/disconnect", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "/api/disconnect", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, "/api/read/vsd_current").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_openapi_document() {
    let (app, _) = router(&MockDevice::new());
    let (status, body) = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().unwrap();
    for path in [
        "/health",
        "/api/connect",
        "/api/read/{id}",
        "/api/write",
        "/api/read_batch",
        "/api/site_name",
    ] {
        assert!(paths.contains_key(path), "missing {}", path);
    }
}
