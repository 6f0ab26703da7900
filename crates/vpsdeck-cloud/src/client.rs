//! Vendor REST client contract and its reqwest implementation
//!
//! Adapters only see [`VendorClient`]: one authenticated JSON call per
//! invocation, returning either the vendor's JSON or a vendor-native
//! [`VendorError`]. Retries, backoff and timeouts live here, below the
//! adapters.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const LINODE_API_BASE: &str = "https://api.linode.com/v4";
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether repeating the request cannot change the outcome. A `POST`
    /// that reached the vendor may already have created something.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, HttpMethod::Post)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Vendor-native failure, before normalization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VendorError {
    /// The vendor answered with an error payload and/or status
    #[error("vendor responded with status {status:?}")]
    Response {
        status: Option<u16>,
        status_text: Option<String>,
        body: Option<Value>,
    },

    /// Retries were exhausted on HTTP 429
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32, body: Option<Value> },

    /// Transport or decoding failure with no vendor payload
    #[error("{0}")]
    Failure(String),
}

impl VendorError {
    pub fn status(status: u16, body: Option<Value>) -> Self {
        VendorError::Response {
            status: Some(status),
            status_text: None,
            body,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            VendorError::Response { status, .. } => *status,
            VendorError::RateLimited { .. } => Some(429),
            VendorError::Failure(_) => None,
        }
    }

    /// JSON snapshot kept on the normalized error as `original_error`
    pub fn to_json(&self) -> Value {
        match self {
            VendorError::Response {
                status,
                status_text,
                body,
            } => serde_json::json!({
                "status": status,
                "statusText": status_text,
                "body": body,
            }),
            VendorError::RateLimited { attempts, body } => serde_json::json!({
                "status": 429,
                "attempts": attempts,
                "body": body,
            }),
            VendorError::Failure(message) => serde_json::json!({ "message": message }),
        }
    }
}

/// Authenticated JSON call against a single vendor API
#[async_trait]
pub trait VendorClient: Send + Sync {
    /// `path` is relative to the vendor API base and may carry a query
    /// string. Empty success bodies come back as `Value::Null`.
    async fn call_with_headers(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: &str,
        headers: &[(&str, &str)],
    ) -> Result<Value, VendorError>;

    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Value, VendorError> {
        self.call_with_headers(method, path, body, token, &[]).await
    }
}

/// Retry configuration for vendor calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retrying after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Connection settings for [`HttpVendorClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            user_agent: format!("vpsdeck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-backed [`VendorClient`] with bearer auth and retry/backoff
pub struct HttpVendorClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl HttpVendorClient {
    pub fn new(base_url: impl Into<String>, options: &ClientOptions) -> Result<Self, VendorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| VendorError::Failure(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: options.retry.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read_body(response: reqwest::Response) -> Option<Value> {
        let text = response.text().await.ok()?;
        if text.trim().is_empty() {
            return None;
        }
        Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn retry_after(response: &reqwest::Response) -> Option<Duration> {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

#[async_trait]
impl VendorClient for HttpVendorClient {
    /// Retries connection failures and 429 for every method. Timeouts and
    /// 5xx are retried only for idempotent methods, since the vendor may
    /// have acted on a `POST` before failing.
    async fn call_with_headers(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: &str,
        headers: &[(&str, &str)],
    ) -> Result<Value, VendorError> {
        let url = self.url(path);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("{} {} (attempt {}/{})", method, url, attempt, max_attempts);

            let mut request = self
                .client
                .request(method.into(), &url)
                .bearer_auth(token);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e)
                    if attempt < max_attempts
                        && (e.is_connect() || (e.is_timeout() && method.is_idempotent())) =>
                {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!("{} {} failed ({}), retrying in {:?}", method, url, e, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    return Err(VendorError::Failure(format!(
                        "Request to {} failed: {}",
                        url, e
                    )));
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(Self::read_body(response).await.unwrap_or(Value::Null));
            }

            let retryable = status.as_u16() == 429
                || (status.is_server_error() && method.is_idempotent());
            if retryable && attempt < max_attempts {
                let delay = Self::retry_after(&response)
                    .map(|d| d.min(self.retry.max_delay))
                    .unwrap_or_else(|| self.retry.delay_for(attempt));
                tracing::warn!(
                    "{} {} returned {}, retrying in {:?}",
                    method,
                    url,
                    status.as_u16(),
                    delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = Self::read_body(response).await;
            if status.as_u16() == 429 {
                return Err(VendorError::RateLimited {
                    attempts: attempt,
                    body,
                });
            }
            return Err(VendorError::Response {
                status: Some(status.as_u16()),
                status_text: None,
                body,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_options(max_attempts: u32) -> ClientOptions {
        ClientOptions {
            retry: RetryConfig {
                max_attempts,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 2.0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(1), Duration::from_secs(1));
        assert_eq!(retry.delay_for(2), Duration::from_secs(2));
        assert_eq!(retry.delay_for(3), Duration::from_secs(4));
        assert_eq!(retry.delay_for(10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_success_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sizes"))
            .and(bearer_token("tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"sizes": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(3)).unwrap();
        let value = client
            .call(HttpMethod::Get, "/sizes", None, "tok")
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"sizes": []}));
    }

    #[tokio::test]
    async fn test_post_sends_body_and_empty_reply_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/droplets/1/actions"))
            .and(body_json(serde_json::json!({"type": "reboot"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(1)).unwrap();
        let body = serde_json::json!({"type": "reboot"});
        let value = client
            .call(HttpMethod::Post, "droplets/1/actions", Some(&body), "tok")
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/droplets/9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                serde_json::json!({"id": "not_found", "message": "The resource you requested could not be found."}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(3)).unwrap();
        let err = client
            .call(HttpMethod::Get, "/droplets/9", None, "tok")
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), Some(404));
        match err {
            VendorError::Response { body: Some(body), .. } => assert_eq!(body["id"], "not_found"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/linode/types"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(3)).unwrap();
        let err = client
            .call(HttpMethod::Get, "/linode/types", None, "tok")
            .await
            .unwrap_err();

        assert!(matches!(err, VendorError::RateLimited { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_server_error_recovers_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/regions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/regions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(2)).unwrap();
        let value = client
            .call(HttpMethod::Get, "/regions", None, "tok")
            .await
            .unwrap();
        assert_eq!(value["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_post_server_error_is_not_resent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/linode/instances"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/linode/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(3)).unwrap();
        let body = serde_json::json!({"label": "web-1"});
        let err = client
            .call(HttpMethod::Post, "/linode/instances", Some(&body), "tok")
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), Some(502));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn test_post_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/droplets"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/droplets"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(serde_json::json!({"droplet": {"id": 7}})),
            )
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(3)).unwrap();
        let body = serde_json::json!({"name": "web-1"});
        let value = client
            .call(HttpMethod::Post, "/droplets", Some(&body), "tok")
            .await
            .unwrap();

        assert_eq!(value["droplet"]["id"], 7);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_extra_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/linode/stackscripts"))
            .and(header("X-Filter", r#"{"is_public":true}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpVendorClient::new(server.uri(), &fast_options(1)).unwrap();
        client
            .call_with_headers(
                HttpMethod::Get,
                "/linode/stackscripts",
                None,
                "tok",
                &[("X-Filter", r#"{"is_public":true}"#)],
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_only_post_is_non_idempotent() {
        assert!(!HttpMethod::Post.is_idempotent());
        assert!(HttpMethod::Get.is_idempotent());
        assert!(HttpMethod::Put.is_idempotent());
        assert!(HttpMethod::Delete.is_idempotent());
    }
}
