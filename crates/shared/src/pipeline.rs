use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use tracing::{error, info};

use crate::alapi::AlapiClient;
use crate::article::ArticleRenderer;
use crate::config::Config;
use crate::emlog::EmlogClient;
use crate::error::PipelineError;
use crate::feishu::FeishuNotifier;
use crate::http::{build_client, RetryPolicy};
use crate::models::NotifyEvent;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Fetch and render only; nothing is published or notified.
    pub dry_run: bool,
    /// Also write the rendered HTML here.
    pub output_dir: Option<PathBuf>,
    pub with_image: bool,
    pub notify: bool,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            output_dir: None,
            with_image: true,
            notify: true,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub title: String,
    pub headlines: usize,
    pub article_id: Option<String>,
    pub article_url: Option<String>,
    pub saved_to: Option<PathBuf>,
}

/// One daily run: fetch, render, publish, notify.
pub struct Pipeline {
    alapi: AlapiClient,
    emlog: EmlogClient,
    notifier: FeishuNotifier,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(config: &Config, options: PipelineOptions) -> Result<Self> {
        let client = build_client(&config.http)?;

        let notifier = if options.notify && !options.dry_run {
            FeishuNotifier::new(client.clone(), &config.feishu)
        } else {
            FeishuNotifier::disabled(client.clone(), &config.feishu)
        };

        Ok(Self {
            alapi: AlapiClient::new(client.clone(), &config.alapi, options.retry),
            emlog: EmlogClient::new(client, &config.emlog, options.retry),
            notifier,
            options,
        })
    }

    /// Run once. On failure a notification is attempted before the original
    /// error is handed back to the caller.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        match self.execute().await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(kind = ?e.kind(), error = %e, "💥 Daily briefing run failed");
                self.notifier
                    .notify(&NotifyEvent::Failed {
                        kind: e.kind(),
                        message: e.message().to_string(),
                        timestamp: Local::now(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<RunReport, PipelineError> {
        info!("🚀 Fetching daily briefing");
        let digest = self.alapi.fetch_digest().await?;

        let image = if self.options.with_image {
            self.alapi.fetch_image().await
        } else {
            None
        };

        let now = Local::now();
        let article = ArticleRenderer::render(&digest, image.as_ref(), now);

        let saved_to = match &self.options.output_dir {
            Some(dir) => {
                let path = ArticleRenderer::save(&article, dir, now)?;
                info!(path = %path.display(), "Saved rendered article");
                Some(path)
            }
            None => None,
        };

        let mut report = RunReport {
            title: article.title.clone(),
            headlines: digest.headlines.len(),
            article_id: None,
            article_url: None,
            saved_to,
        };

        if self.options.dry_run {
            info!(title = %report.title, "Dry run, skipping publish");
            return Ok(report);
        }

        info!(title = %article.title, "📝 Publishing article");
        let published = self.emlog.publish(&article).await?;
        let article_url = self.emlog.article_url(&published.article_id);

        self.notifier
            .notify(&NotifyEvent::Published {
                title: article.title,
                article_id: published.article_id.clone(),
                article_url: article_url.clone(),
                timestamp: Local::now(),
            })
            .await;

        report.article_id = Some(published.article_id);
        report.article_url = Some(article_url);
        Ok(report)
    }
}
