//! Failure taxonomy for a publish run.

use thiserror::Error;

/// Which stage of the run failed. Drives the copy of the failure notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    Publish,
    Generic,
}

impl FailureKind {
    /// Category label shown in the chat card.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Fetch => "数据获取失败",
            FailureKind::Publish => "文章发布失败",
            FailureKind::Generic => "脚本执行失败",
        }
    }
}

/// A failed run. Each component returns its own variant so the orchestrator
/// never has to inspect message text.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("{0}")]
    Generic(String),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Fetch(_) => FailureKind::Fetch,
            PipelineError::Publish(_) => FailureKind::Publish,
            PipelineError::Generic(_) => FailureKind::Generic,
        }
    }

    /// The wrapped message, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            PipelineError::Fetch(m) | PipelineError::Publish(m) | PipelineError::Generic(m) => m,
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(e: anyhow::Error) -> Self {
        PipelineError::Generic(format!("{:#}", e))
    }
}

/// Errors raised inside the notifier. Never escape `FeishuNotifier::notify`.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to obtain tenant access token: {0}")]
    Auth(String),

    #[error("message API rejected the card: {0}")]
    Rejected(String),

    #[error("failed to serialize card: {0}")]
    Serialize(#[from] serde_json::Error),
}
