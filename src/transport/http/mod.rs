use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::{ConfigError, ProviderError};

const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";
const TOO_MANY_REQUESTS: u16 = 429;

/// Auth and extra headers attached to a single call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestContext {
    pub bearer_token: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Response header carrying the server request id; `x-request-id` when unset.
    pub request_id_header: Option<String>,
}

impl RequestContext {
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_request_id_header(mut self, name: impl Into<String>) -> Self {
        self.request_id_header = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub retryable_status_codes: Vec<u16>,
}

enum Failure<'a> {
    Status(u16),
    Transport(&'a reqwest::Error),
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: "max_attempts must be >= 1".to_string(),
            });
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: "max_backoff_ms must be >= initial_backoff_ms".to_string(),
            });
        }
        if let Some(status) = self
            .retryable_status_codes
            .iter()
            .copied()
            .find(|status| !(100..=599).contains(status))
        {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: format!("retryable status code must be in 100..=599: {status}"),
            });
        }
        Ok(())
    }

    /// Delay before the next attempt, or `None` when `failure` is final.
    ///
    /// POST only retries on 429 and on connect failures.
    fn next_delay(&self, method: &Method, attempt: u32, failure: Failure<'_>) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let idempotent = is_idempotent(method);
        let retryable = match failure {
            Failure::Status(code) => {
                self.retryable_status_codes.contains(&code)
                    && (idempotent || code == TOO_MANY_REQUESTS)
            }
            Failure::Transport(error) => {
                error.is_connect() || (idempotent && (error.is_timeout() || error.is_request()))
            }
        };

        retryable.then(|| self.backoff_duration_for_retry(attempt.saturating_sub(1)))
    }

    fn backoff_duration_for_retry(&self, retry_index: u32) -> Duration {
        let multiplier = 1_u64.checked_shl(retry_index.min(63)).unwrap_or(u64::MAX);
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(multiplier)
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            retryable_status_codes: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

/// JSON-over-HTTP with per-request timeout and retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout_ms: u64, retry_policy: RetryPolicy) -> Result<Self, ConfigError> {
        Self::with_client(reqwest::Client::new(), timeout_ms, retry_policy)
    }

    pub fn with_client(
        client: reqwest::Client,
        timeout_ms: u64,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout { timeout_ms });
        }
        retry_policy.validate()?;

        Ok(Self {
            client,
            retry_policy,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub async fn get_json<TResp>(
        &self,
        operation: &str,
        url: &str,
        ctx: &RequestContext,
    ) -> Result<TResp, ProviderError>
    where
        TResp: DeserializeOwned,
    {
        self.execute(operation, Method::GET, url, None, ctx).await
    }

    pub async fn post_json<TReq, TResp>(
        &self,
        operation: &str,
        url: &str,
        body: &TReq,
        ctx: &RequestContext,
    ) -> Result<TResp, ProviderError>
    where
        TReq: Serialize + ?Sized,
        TResp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|error| ProviderError::Serialization {
            operation: operation.to_string(),
            request_id: None,
            message: error.to_string(),
        })?;

        self.execute(operation, Method::POST, url, Some(payload), ctx)
            .await
    }

    pub async fn delete_json<TResp>(
        &self,
        operation: &str,
        url: &str,
        ctx: &RequestContext,
    ) -> Result<TResp, ProviderError>
    where
        TResp: DeserializeOwned,
    {
        self.execute(operation, Method::DELETE, url, None, ctx)
            .await
    }

    async fn execute<TResp>(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        ctx: &RequestContext,
    ) -> Result<TResp, ProviderError>
    where
        TResp: DeserializeOwned,
    {
        let headers = PreparedHeaders::from_context(operation, ctx)?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(operation, %method, url, attempt, "sending request");

            let sent = self
                .send_once(&method, url, body.as_deref(), &headers)
                .await;
            let (error, delay) = match sent {
                Ok(response) if response.status().is_success() => {
                    let request_id = headers.request_id(response.headers());
                    return response.json::<TResp>().await.map_err(|error| {
                        ProviderError::Serialization {
                            operation: operation.to_string(),
                            request_id,
                            message: error.to_string(),
                        }
                    });
                }
                Ok(response) => {
                    let status_code = response.status().as_u16();
                    let request_id = headers.request_id(response.headers());
                    let delay = self.retry_policy.next_delay(
                        &method,
                        attempt,
                        Failure::Status(status_code),
                    );
                    let error = status_error(operation, status_code, request_id, response).await;
                    (error, delay)
                }
                Err(error) => {
                    let delay = self.retry_policy.next_delay(
                        &method,
                        attempt,
                        Failure::Transport(&error),
                    );
                    let error = ProviderError::Transport {
                        operation: operation.to_string(),
                        request_id: None,
                        message: error.to_string(),
                    };
                    (error, delay)
                }
            };

            let Some(delay) = delay else {
                return Err(error);
            };
            warn!(operation, attempt, ?delay, error = %error, "retrying request");
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&[u8]>,
        headers: &PreparedHeaders,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .timeout(self.timeout)
            .headers(headers.headers.clone());

        if let Some(payload) = body {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(payload.to_vec());
        }

        request.send().await
    }
}

struct PreparedHeaders {
    headers: HeaderMap,
    request_id_header: HeaderName,
}

impl PreparedHeaders {
    fn from_context(operation: &str, ctx: &RequestContext) -> Result<Self, ProviderError> {
        let invalid = |message: String| ProviderError::Protocol {
            operation: operation.to_string(),
            request_id: None,
            message,
        };

        let request_id_name = ctx
            .request_id_header
            .as_deref()
            .unwrap_or(DEFAULT_REQUEST_ID_HEADER);
        let request_id_header = HeaderName::from_bytes(request_id_name.as_bytes())
            .map_err(|error| invalid(format!("invalid header name: {request_id_name}: {error}")))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &ctx.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|error| invalid(format!("invalid bearer token header value: {error}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &ctx.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|error| invalid(format!("invalid header name: {name}: {error}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|error| invalid(format!("invalid header value for {name}: {error}")))?;
            headers.insert(header_name, header_value);
        }

        Ok(Self {
            headers,
            request_id_header,
        })
    }

    fn request_id(&self, response_headers: &HeaderMap) -> Option<String> {
        response_headers
            .get(&self.request_id_header)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

async fn status_error(
    operation: &str,
    status_code: u16,
    request_id: Option<String>,
    response: Response,
) -> ProviderError {
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => extract_error_message(&body).unwrap_or(body),
        Ok(_) => format!("http status {status_code}"),
        Err(error) => {
            format!("http status {status_code}; failed to read response body: {error}")
        }
    };

    let operation = operation.to_string();
    match status_code {
        401 | 403 => ProviderError::CredentialsRejected {
            operation,
            request_id,
            message,
        },
        404 => ProviderError::NotFound {
            operation,
            request_id,
            message,
        },
        400..=499 if is_not_found_message(&message) => ProviderError::NotFound {
            operation,
            request_id,
            message,
        },
        _ => ProviderError::Status {
            operation,
            status_code,
            request_id,
            message,
        },
    }
}

/// Pulls `error.message` out of a vendor error envelope.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

// e.g. "No assistant found with id 'asst_1'."
fn is_not_found_message(message: &str) -> bool {
    message.starts_with("No ") && message.contains(" found with")
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE
    )
}
