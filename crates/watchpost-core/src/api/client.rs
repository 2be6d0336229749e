//! HTTP client for the monitoring backend.
//!
//! Every call is sent to `<proxy origin><api prefix><path>`; the proxy strips
//! the prefix and forwards to the backend origin, so the backend URL is only
//! used in log records and timeout messages. Each exchange runs under its
//! own deadline and the in-flight future is dropped when it expires.

use std::time::{Duration, Instant};

use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::utils::truncate_body;

use super::{ApiEnvelope, ApiError, Payload, RequestDescriptor};

/// Maximum number of body bytes included in a log record.
const MAX_LOGGED_BODY_LENGTH: usize = 500;

/// Status and leniently parsed body of a completed exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub payload: Payload,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    /// Proxy origin plus API prefix, without a trailing slash.
    base_url: String,
    /// Backend origin the proxy forwards to.
    backend_url: String,
    backend_host: String,
    default_timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        // No client-wide timeout: deadlines are applied per request.
        let client = Client::builder()
            .user_agent(concat!("watchpost/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: join_url(&config.proxy_origin, &config.api_prefix),
            backend_url: config.api_base_url.trim_end_matches('/').to_string(),
            backend_host: config.backend_host(),
            default_timeout: config.request_timeout(),
        })
    }

    /// Full URL a descriptor path is sent to.
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Send a request and decode the response as an `ApiEnvelope`.
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<ApiEnvelope, ApiError> {
        let response = self.send_raw(descriptor).await?;
        ApiEnvelope::from_payload(response.payload)
    }

    /// Send a request and return the status and lenient payload.
    ///
    /// Fails with `Timeout` when the deadline passes, `Transport` when the
    /// connection fails and `HttpStatus` for any non-2xx status, even when
    /// the body parsed.
    pub async fn send_raw(&self, descriptor: RequestDescriptor) -> Result<HttpResponse, ApiError> {
        let url = self.url_for(&descriptor.path);
        let timeout = descriptor.timeout.unwrap_or(self.default_timeout);

        debug!(
            method = %descriptor.method,
            path = %descriptor.path,
            proxy = %url,
            backend = %join_url(&self.backend_url, &descriptor.path),
            host = %self.backend_host,
            headers = ?redacted_headers(&descriptor),
            body = ?descriptor.body.as_ref().map(redacted_body),
            "Sending request"
        );

        let started = Instant::now();
        // Dropping the exchange future on expiry cancels the connection.
        let result = match tokio::time::timeout(timeout, self.exchange(&url, &descriptor, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error(timeout)),
        };

        match result {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(
                    method = %descriptor.method,
                    url = %url,
                    host = %self.backend_host,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Request failed"
                );
                Err(e)
            }
        }
    }

    async fn exchange(
        &self,
        url: &str,
        descriptor: &RequestDescriptor,
        timeout: Duration,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = self
            .client
            .request(descriptor.method.to_reqwest(), url)
            .headers(self.build_headers(descriptor)?);

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(ref body) = descriptor.body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|e| self.map_transport(e, timeout))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let response_headers = response.headers().clone();
        let text = response.text().await.map_err(|e| self.map_transport(e, timeout))?;

        debug!(
            status = status.as_u16(),
            status_text = status.canonical_reason().unwrap_or_default(),
            host = %self.backend_host,
            headers = ?response_headers,
            length = text.len(),
            body = %truncate_body(&text, MAX_LOGGED_BODY_LENGTH),
            "Received response"
        );

        if !status.is_success() {
            warn!(status = status.as_u16(), url = url, "Non-success status");
            return Err(ApiError::from_status(status, &text));
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            payload: Payload::parse(content_type.as_deref(), text),
        })
    }

    /// Default JSON content type, then the descriptor's own headers on top.
    fn build_headers(&self, descriptor: &RequestDescriptor) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        for (name, value) in &descriptor.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid header name {}: {}", name, e)))?;
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid value for header {}: {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn map_transport(&self, err: reqwest::Error, timeout: Duration) -> ApiError {
        if err.is_timeout() {
            self.timeout_error(timeout)
        } else {
            ApiError::Transport(err)
        }
    }

    fn timeout_error(&self, timeout: Duration) -> ApiError {
        ApiError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
            host: self.backend_host.clone(),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Headers as they appear in log records, with credentials masked.
fn redacted_headers(descriptor: &RequestDescriptor) -> Vec<(String, String)> {
    descriptor
        .headers
        .iter()
        .map(|(k, v)| {
            if k.eq_ignore_ascii_case("authorization") {
                (k.clone(), "Bearer <redacted>".to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Fields whose values never reach a log record.
const SECRET_FIELDS: &[&str] = &["password", "refresh_token", "access_token"];

fn redacted_body(body: &Value) -> String {
    let mut body = body.clone();
    if let Value::Object(ref mut map) = body {
        for field in SECRET_FIELDS {
            if let Some(v) = map.get_mut(*field) {
                *v = Value::String("<redacted>".to_string());
            }
        }
    }
    truncate_body(&body.to_string(), MAX_LOGGED_BODY_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        let config = Config {
            proxy_origin: "http://localhost:5173/".to_string(),
            ..Config::default()
        };
        HttpClient::new(&config).expect("client builds")
    }

    #[test]
    fn test_url_goes_through_proxy_prefix() {
        let client = client();
        assert_eq!(
            client.url_for("/auth/login"),
            "http://localhost:5173/api/auth/login"
        );
        assert_eq!(
            client.url_for("monitor-metrics/latest"),
            "http://localhost:5173/api/monitor-metrics/latest"
        );
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a", "/b"), "http://a/b");
        assert_eq!(join_url("http://a/", "b"), "http://a/b");
        assert_eq!(join_url("http://a/", ""), "http://a");
    }

    #[test]
    fn test_descriptor_headers_override_defaults() {
        let client = client();
        let req = RequestDescriptor::post("/cache/clear")
            .header("Content-Type", "text/plain")
            .header("X-Request-Id", "42");
        let headers = client.build_headers(&req).unwrap();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get("x-request-id").unwrap(), "42");
    }

    #[test]
    fn test_invalid_header_value_is_request_error() {
        let client = client();
        let req = RequestDescriptor::get("/x").header("X-Bad", "line\nbreak");
        assert!(matches!(
            client.build_headers(&req),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_secret_body_fields_are_redacted_in_logs() {
        let body = serde_json::json!({"username": "alice", "password": "hunter2"});
        let logged = redacted_body(&body);
        assert!(logged.contains("alice"));
        assert!(!logged.contains("hunter2"));
    }

    #[test]
    fn test_authorization_is_redacted_in_logs() {
        let req = RequestDescriptor::get("/x")
            .header("Authorization", "Bearer secret")
            .header("Accept", "application/json");
        let headers = redacted_headers(&req);
        assert!(headers.iter().all(|(_, v)| !v.contains("secret")));
        assert!(headers.contains(&("Accept".to_string(), "application/json".to_string())));
    }

    #[tokio::test]
    async fn test_transport_timeout_reports_the_request_deadline() {
        use wiremock::matchers::any;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap()
            .get(server.uri())
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        match client().map_transport(err, Duration::from_millis(250)) {
            ApiError::Timeout { timeout_ms, .. } => assert_eq!(timeout_ms, 250),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
