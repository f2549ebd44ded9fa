/*!
 * Shared HTTP plumbing for the remote backends.
 *
 * Requests are retried with exponential backoff on connection failures,
 * HTTP 429 and 5xx responses. Other client errors fail immediately.
 */

use log::{error, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::app_config::BackendConfig;
use crate::errors::ProviderError;

/// HTTP client with retry policy
#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: Client,
    /// Name used in log and error messages
    service: &'static str,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds, doubled on each retry
    backoff_base_ms: u64,
}

impl RetryingClient {
    pub fn new(service: &'static str, timeout: Duration, max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            service,
            max_retries,
            backoff_base_ms,
        }
    }

    pub fn from_config(service: &'static str, config: &BackendConfig) -> Self {
        Self::new(
            service,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
            config.backoff_base_ms,
        )
    }

    /// Underlying reqwest client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request built by `build` and decode the JSON body
    ///
    /// `build` is called once per attempt since a sent request cannot be reused.
    pub async fn send_json<T, F>(&self, build: F) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            let result = match build(&self.client).send().await {
                Ok(response) => self.decode(response).await,
                Err(e) => Err(ProviderError::ConnectionError(format!(
                    "Failed to send request to {}: {}",
                    self.service, e
                ))),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                    warn!(
                        "{} request failed: {} - retrying in {}ms (attempt {}/{})",
                        self.service,
                        e,
                        backoff_ms,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    error!("{} request failed: {}", self.service, e);
                    return Err(e);
                }
            }
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                ProviderError::ParseError(format!("Invalid {} response: {}", self.service, e))
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::AuthenticationError(format!("{} ({}): {}", self.service, status, error_text))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                ProviderError::RateLimitExceeded(format!("{}: {}", self.service, error_text))
            }
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            },
        })
    }
}

/// Fail unless a backend returned one result per source
pub fn ensure_count<T>(expected: usize, results: Vec<T>) -> Result<Vec<T>, ProviderError> {
    if results.len() != expected {
        return Err(ProviderError::ResponseMismatch {
            expected,
            received: results.len(),
        });
    }
    Ok(results)
}
