use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, UPGRADE_INSECURE_REQUESTS};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

use crate::config::HttpConfig;
use crate::error::FetchError;

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay before attempt `attempt + 1`, doubling each time.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub fn create_client(config: &HttpConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    ClientBuilder::new()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .pool_max_idle_per_host(2)
        .build()
        .map_err(FetchError::Client)
}

/// GET with bounded retries on transport errors, 429 and 5xx. Other client
/// errors are returned immediately.
pub async fn fetch_with_retry(client: &Client, url: &str, policy: RetryPolicy) -> Result<Response, FetchError> {
    let mut attempts = 0;

    loop {
        attempts += 1;

        let failure = match client.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                warn!("HTTP error {}: {}", status, url);
                status_error(status, url)
            }
            Err(e) => {
                error!("Request failed for {}: {}", url, e);
                transport_error(e, url)
            }
        };

        if !failure.is_transient() {
            return Err(failure);
        }

        if attempts >= policy.max_attempts {
            return Err(if attempts == 1 {
                failure
            } else {
                FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts,
                    last: Box::new(failure),
                }
            });
        }

        let delay = policy.delay_after(attempts);
        warn!("Retrying in {:?}... (attempt {}/{})", delay, attempts + 1, policy.max_attempts);
        sleep(delay).await;
    }
}

fn status_error(status: StatusCode, url: &str) -> FetchError {
    if status == StatusCode::FORBIDDEN {
        FetchError::Blocked { url: url.to_string() }
    } else {
        FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}

fn transport_error(e: reqwest::Error, url: &str) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            source: e,
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: e,
        }
    }
}
