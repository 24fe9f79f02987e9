use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

use crate::config::HttpSettings;

// The blog sits behind a WAF that rejects non-browser agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Build the HTTP client shared by every component of a run.
pub fn build_client(settings: &HttpSettings) -> Result<Client> {
    if settings.insecure_tls {
        warn!("TLS certificate verification is disabled for this run");
    }

    client_builder(settings)
        .build()
        .context("Failed to create HTTP client")
}

fn client_builder(settings: &HttpSettings) -> ClientBuilder {
    Client::builder()
        .timeout(settings.timeout)
        .user_agent(USER_AGENT)
        .tls_danger_accept_invalid_certs(settings.insecure_tls)
}

/// Transport-level retry for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2_u32.pow(attempt)
    }

    /// Send `request`, re-sending on 429/5xx gateway statuses and on
    /// connect/timeout errors. Once retries are exhausted the last response
    /// (or error) is handed back unchanged.
    ///
    /// Non-idempotent requests (POST) are only re-sent when the connection
    /// could not be established, since the server may already have acted on
    /// a request that ended in a 5xx or a read timeout.
    pub async fn send(&self, request: RequestBuilder) -> reqwest::Result<Response> {
        let (client, request) = request.build_split();
        let request = request?;
        let idempotent = request.method().is_idempotent();
        let mut attempt = 0;

        loop {
            // Streaming bodies can't be replayed; send those once.
            let Some(current) = request.try_clone() else {
                return client.execute(request).await;
            };

            match client.execute(current).await {
                Ok(response)
                    if idempotent
                        && attempt < self.max_retries
                        && is_retryable(response.status()) =>
                {
                    warn!(
                        status = %response.status(),
                        attempt = attempt + 1,
                        "Transient HTTP status, retrying"
                    );
                }
                Err(e)
                    if attempt < self.max_retries
                        && (e.is_connect() || (idempotent && e.is_timeout())) =>
                {
                    warn!(error = %e, attempt = attempt + 1, "Transport error, retrying");
                }
                other => return other,
            }

            tokio::time::sleep(self.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
