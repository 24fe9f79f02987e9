// Public modules
pub mod alapi;
pub mod article;
pub mod config;
pub mod emlog;
pub mod error;
pub mod feishu;
pub mod http;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use alapi::AlapiClient;
pub use article::ArticleRenderer;
pub use config::Config;
pub use emlog::EmlogClient;
pub use error::{FailureKind, NotifyError, PipelineError};
pub use feishu::FeishuNotifier;
pub use models::{Article, Digest, DigestImage, NotifyEvent, PublishResult};
pub use pipeline::{Pipeline, PipelineOptions, RunReport};
