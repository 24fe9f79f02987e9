use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::AlapiConfig;
use crate::error::PipelineError;
use crate::http::RetryPolicy;
use crate::models::{Digest, DigestImage};

/// ALAPI reports success in the body as `code: 200`.
const SUCCESS_CODE: i64 = 200;

#[derive(Debug, Deserialize)]
struct AlapiResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Digest>,
}

/// Client for the ALAPI `zaobao` daily briefing endpoint.
pub struct AlapiClient {
    client: Client,
    url: String,
    token: String,
    retry: RetryPolicy,
}

impl AlapiClient {
    pub fn new(client: Client, config: &AlapiConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
            retry,
        }
    }

    pub async fn fetch_digest(&self) -> Result<Digest, PipelineError> {
        let response = self
            .retry
            .send(self.request("json"))
            .await
            .map_err(|e| PipelineError::Fetch(format!("request to briefing API failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(PipelineError::Fetch(format!(
                "briefing API returned {} - {}",
                status, error_text
            )));
        }

        let body = response
            .json::<AlapiResponse>()
            .await
            .map_err(|e| PipelineError::Fetch(format!("unreadable briefing response: {}", e)))?;

        if body.code != Some(SUCCESS_CODE) {
            let code = body
                .code
                .map_or_else(|| "missing".to_string(), |c| c.to_string());
            return Err(PipelineError::Fetch(format!(
                "briefing API error {}: {}",
                code,
                body.msg.as_deref().unwrap_or("未知错误")
            )));
        }

        let digest = body.data.unwrap_or_default();
        info!(headlines = digest.headlines.len(), "Fetched daily briefing");
        Ok(digest)
    }

    /// Best effort: any failure is logged and reported as "no image".
    pub async fn fetch_image(&self) -> Option<DigestImage> {
        match self.try_fetch_image().await {
            Ok(image) => image,
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(error = %error, "Failed to fetch briefing image, continuing without it");
                None
            }
        }
    }

    async fn try_fetch_image(&self) -> Result<Option<DigestImage>> {
        let response = self
            .retry
            .send(self.request("image"))
            .await
            .context("Failed to request briefing image")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("briefing image request returned {}", status);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .unwrap_or_default();

        // Errors come back as JSON or HTML even for format=image.
        if !content_type.starts_with("image/") {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "briefing API returned {:?} instead of an image: {}",
                content_type,
                error_text
            );
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read briefing image body")?;

        if bytes.is_empty() {
            debug!("Briefing image response was empty");
            return Ok(None);
        }

        info!(bytes = bytes.len(), content_type = %content_type, "Fetched briefing image");
        Ok(Some(DigestImage {
            content_type,
            bytes: bytes.to_vec(),
        }))
    }

    fn request(&self, format: &str) -> reqwest::RequestBuilder {
        self.client
            .get(&self.url)
            .query(&[("token", self.token.as_str()), ("format", format)])
    }
}
