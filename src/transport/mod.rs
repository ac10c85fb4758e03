//! Retry-hardened HTTP transport shared by every API component.
//!
//! All requests to the Enedis API go through a single [`Transport`] backed by
//! one connection-pooled [`reqwest::Client`]. Transient failures (connection
//! errors, timeouts, 5xx responses the provider is known to emit under load)
//! are retried a bounded number of times with exponential backoff; client
//! errors (4xx) are surfaced immediately.

use log::{debug, warn};
use reqwest::{Client, Method};
use std::time::Duration;
use tokio::time::sleep;

pub mod error;

use error::TransportError;

/// Per-request timeout applied when none is configured explicitly.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Retry schedule for transient failures.
///
/// The delay before retry `n` (1-based) is `backoff_factor * 2^(n - 1)`
/// seconds, so the defaults wait 0.1 s then 0.2 s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base of the exponential backoff schedule, in seconds.
    pub backoff_factor: f64,
    /// Response statuses that are considered transient.
    pub retried_statuses: Vec<u16>,
    /// Methods eligible for retry. Every Enedis endpoint is idempotent or a
    /// token fetch, so both GET and POST are retried by default.
    pub retried_methods: Vec<Method>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_factor: 0.1,
            retried_statuses: vec![500, 502, 503, 504],
            retried_methods: vec![Method::GET, Method::POST],
        }
    }
}

impl RetryPolicy {
    /// Delay before the given 1-based retry attempt.
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31) as i32;
        Duration::from_secs_f64(self.backoff_factor * 2f64.powi(exponent))
    }

    fn retries_status(&self, status: u16) -> bool {
        self.retried_statuses.contains(&status)
    }

    fn retries_method(&self, method: &Method) -> bool {
        self.retried_methods.contains(method)
    }
}

/// Body attached to an outgoing [`ApiRequest`].
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` fields (token endpoint).
    Form(Vec<(String, String)>),
    /// JSON document (perimeter endpoint).
    Json(serde_json::Value),
}

/// Request envelope handed to [`Transport::send`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds an `Authorization: Bearer {token}` header.
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }
}

/// Response envelope returned by [`Transport::send`]. Always 2xx; any other
/// status becomes a [`TransportError`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Deserializes the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP client wrapper enforcing a per-request timeout and bounded retries.
///
/// Cheap to share behind an `Arc`; the inner [`reqwest::Client`] pools
/// connections across all calls.
#[derive(Debug)]
pub struct Transport {
    client: Client,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default(), DEFAULT_TIMEOUT)
    }

    pub fn with_policy(retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            retry,
            timeout,
        }
    }

    /// Sends the request, retrying transient failures per the policy.
    ///
    /// Returns the response once a 2xx status is received. A 4xx status fails
    /// immediately; a retried status or network failure is re-attempted up to
    /// `max_retries` times, after which the last failure is surfaced.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let retryable_method = self.retry.retries_method(&request.method);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.dispatch(request).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    debug!(
                        "{} {} -> {} (attempt {attempt})",
                        request.method, request.url, response.status
                    );
                    return Ok(response);
                }
                Ok(response) => {
                    let exhausted = attempt > self.retry.max_retries;
                    if exhausted || !retryable_method || !self.retry.retries_status(response.status)
                    {
                        return Err(TransportError::Status {
                            url: request.url.clone(),
                            status: response.status,
                            attempts: attempt,
                            body: response.body,
                        });
                    }
                    warn!(
                        "{} {} returned {}, retrying (attempt {attempt}/{})",
                        request.method,
                        request.url,
                        response.status,
                        self.retry.max_retries + 1
                    );
                }
                Err(err) => {
                    let transient = matches!(
                        err,
                        TransportError::Network { .. } | TransportError::Timeout { .. }
                    );
                    if attempt > self.retry.max_retries || !retryable_method || !transient {
                        return Err(err);
                    }
                    warn!(
                        "{} {} failed ({err}), retrying (attempt {attempt}/{})",
                        request.method,
                        request.url,
                        self.retry.max_retries + 1
                    );
                }
            }
            sleep(self.retry.delay(attempt)).await;
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(self.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        match &request.body {
            Some(RequestBody::Form(fields)) => builder = builder.form(fields),
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            None => {}
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                TransportError::Network {
                    url: request.url.clone(),
                    source: e,
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Body {
            url: request.url.clone(),
            source: e,
        })?;
        Ok(ApiResponse { status, body })
    }
}
