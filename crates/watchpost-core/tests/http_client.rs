use std::time::{Duration, Instant};

use serde_json::json;
use watchpost_core::api::HttpResponse;
use watchpost_core::{ApiError, Config, HttpClient, Payload, RequestDescriptor};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    let config = Config {
        proxy_origin: server.uri(),
        ..Config::default()
    };
    HttpClient::new(&config).expect("client builds")
}

#[tokio::test]
async fn send_goes_through_api_prefix_and_decodes_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/monitor-metrics/latest"))
        .and(query_param("ip", "10.0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": [{"ip": "10.0.0.1", "cpu_usage": 12.5}],
            "message": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client_for(&server)
        .send(RequestDescriptor::get("/monitor-metrics/latest").query("ip", "10.0.0.1"))
        .await
        .unwrap();

    assert!(envelope.is_success());
    assert_eq!(envelope.message.as_deref(), Some("ok"));
    assert_eq!(envelope.data, Some(json!([{"ip": "10.0.0.1", "cpu_usage": 12.5}])));
}

#[tokio::test]
async fn post_sends_json_body_with_default_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"username": "alice", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200})))
        .expect(1)
        .mount(&server)
        .await;

    let req = RequestDescriptor::post("/auth/register")
        .json(&json!({"username": "alice", "password": "pw"}))
        .unwrap();
    let envelope = client_for(&server).send(req).await.unwrap();
    assert_eq!(envelope.code, 200);
}

#[tokio::test]
async fn application_code_is_not_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/monitor-metrics/ips"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 403,
            "message": "Admin only"
        })))
        .mount(&server)
        .await;

    let envelope = client_for(&server)
        .send(RequestDescriptor::get("/monitor-metrics/ips"))
        .await
        .unwrap();
    assert!(!envelope.is_success());
    assert_eq!(envelope.into_result().unwrap_err().to_string(), "Admin only");
}

#[tokio::test]
async fn non_success_status_is_error_even_with_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cache/stats"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": 500,
            "message": "db down"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send(RequestDescriptor::get("/cache/stats"))
        .await
        .unwrap_err();

    match err {
        ApiError::HttpStatus { code, ref status_text, ref body } => {
            assert_eq!(code, 500);
            assert_eq!(status_text, "Internal Server Error");
            assert!(body.contains("db down"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
}

#[tokio::test]
async fn malformed_json_body_is_returned_as_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/monitor-metrics/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"code\": 200,", "application/json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .send_raw(RequestDescriptor::get("/monitor-metrics/statistics"))
        .await
        .unwrap();
    assert_eq!(
        response,
        HttpResponse {
            status: 200,
            payload: Payload::Raw("{\"code\": 200,".to_string()),
        }
    );

    // Envelope decoding cannot make sense of it
    let err = client
        .send(RequestDescriptor::get("/monitor-metrics/statistics"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn plain_text_response_is_raw() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .send_raw(RequestDescriptor::get("/health"))
        .await
        .unwrap();
    assert_eq!(response.payload, Payload::Raw("OK".to_string()));
}

#[tokio::test]
async fn slow_response_times_out_and_is_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/monitor-metrics/system-overview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 200}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let started = Instant::now();
    let err = client_for(&server)
        .send(
            RequestDescriptor::get("/monitor-metrics/system-overview")
                .timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert!(err.to_string().contains("timed out after 100ms"));
    assert!(err.to_string().contains("localhost:8000"));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn config_timeout_applies_when_descriptor_has_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/monitor-metrics/high-cpu"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 200}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = Config {
        proxy_origin: server.uri(),
        request_timeout_ms: 150,
        ..Config::default()
    };
    let err = HttpClient::new(&config)
        .unwrap()
        .send(RequestDescriptor::get("/monitor-metrics/high-cpu"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Timeout { timeout_ms: 150, .. }));
}

#[tokio::test]
async fn unreachable_proxy_is_transport_error() {
    let config = Config {
        proxy_origin: "http://127.0.0.1:1".to_string(),
        ..Config::default()
    };
    let err = HttpClient::new(&config)
        .unwrap()
        .send(RequestDescriptor::get("/monitor-metrics/latest").timeout(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
}
