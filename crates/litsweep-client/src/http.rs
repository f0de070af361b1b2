//! Shared HTTP plumbing for every connector.

use litsweep_core::{AppError, HttpConfig};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// GET client with bounded retry on transient failures.
///
/// Transport errors, 429 and 5xx responses are retried with backoff and become
/// an error once `max_retries` attempts are used up. Retries are not visible
/// to the request ledger. Any other non-success
/// status is not an error: the caller gets `None` and ends the cell there.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("litsweep/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Fetches `url` and decodes the body as JSON.
    ///
    /// A body that is not valid JSON is treated like a non-success status.
    pub async fn get_json(&self, url: &str) -> Result<Option<Value>, AppError> {
        let Some(resp) = self.get(url).await? else {
            return Ok(None);
        };
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        match serde_json::from_str(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(url, error = %e, "Response body is not valid JSON");
                Ok(None)
            }
        }
    }

    /// Fetches `url` and returns the body as text.
    pub async fn get_text(&self, url: &str) -> Result<Option<String>, AppError> {
        let Some(resp) = self.get(url).await? else {
            return Ok(None);
        };
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;
        Ok(Some(body))
    }

    /// Makes an HTTP GET request with automatic retry on transient failures.
    ///
    /// Whether a failure is retried is decided by [`AppError::is_retryable`]:
    /// - Network errors and timeouts back off linearly
    /// - Server errors (5xx) back off linearly
    /// - Rate limiting (429) backs off exponentially
    pub async fn get(&self, url: &str) -> Result<Option<Response>, AppError> {
        let url = Url::parse(url).map_err(|e| AppError::InvalidUrl(format!("{}: {}", url, e)))?;
        let max_retries = self.config.max_retries.max(1);
        let base_delay = self.config.retry_base_delay;
        let mut attempt = 1;

        loop {
            let error = match self.client.get(url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(Some(resp));
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        AppError::RateLimitExceeded
                    } else if status.is_server_error() {
                        AppError::ClientError(format!("Server error: HTTP {}", status.as_u16()))
                    } else {
                        // Client error (4xx except 429): the cell ends here.
                        warn!(%url, status = status.as_u16(), "Request rejected, ending pagination");
                        return Ok(None);
                    }
                }
                Err(e) if e.is_timeout() => AppError::Timeout(self.config.timeout.as_secs()),
                Err(e) if e.is_connect() => {
                    AppError::NetworkError(format!("Connection failed: {}", e))
                }
                Err(e) => AppError::ClientError(e.to_string()),
            };

            if attempt >= max_retries || !error.is_retryable() {
                return Err(error);
            }

            let delay = match error {
                AppError::RateLimitExceeded => base_delay * 2_u32.pow(attempt),
                _ => base_delay * attempt,
            };
            debug!(%url, attempt, ?delay, error = %error, "Transient failure, retrying");
            sleep(delay).await;
            attempt += 1;
        }
    }
}
