//! Feishu (Lark) group notifications.
//!
//! Sending is two requests: exchange the app id/secret for a tenant access
//! token, then post an interactive card to the configured group chat.
//! [`FeishuNotifier::notify`] is best effort and never returns an error; a
//! broken notification must not change the outcome of the run.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FeishuConfig;
use crate::error::NotifyError;
use crate::models::NotifyEvent;

const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
const MESSAGE_PATH: &str = "/open-apis/im/v1/messages";

/// Card header color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Green,
    Red,
}

#[derive(Debug, Serialize)]
pub struct Card {
    config: CardConfig,
    elements: Vec<CardElement>,
    header: CardHeader,
}

#[derive(Debug, Serialize)]
struct CardConfig {
    wide_screen_mode: bool,
}

#[derive(Debug, Serialize)]
struct CardElement {
    tag: &'static str,
    text: CardText,
}

#[derive(Debug, Serialize)]
struct CardText {
    tag: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct CardHeader {
    title: CardText,
    template: Template,
}

impl Card {
    pub fn title(&self) -> &str {
        &self.header.title.content
    }

    pub fn template(&self) -> Template {
        self.header.template
    }

    /// The markdown body.
    pub fn content(&self) -> &str {
        self.elements
            .first()
            .map(|e| e.text.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    tenant_access_token: Option<String>,
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    receive_id: &'a str,
    msg_type: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

pub struct FeishuNotifier {
    client: Client,
    config: FeishuConfig,
    disabled: bool,
}

impl FeishuNotifier {
    pub fn new(client: Client, config: &FeishuConfig) -> Self {
        Self {
            client,
            config: config.clone(),
            disabled: false,
        }
    }

    /// A notifier that logs and drops every event.
    pub fn disabled(client: Client, config: &FeishuConfig) -> Self {
        Self {
            disabled: true,
            ..Self::new(client, config)
        }
    }

    /// Report `event` to the group chat. Failures are logged, never returned.
    pub async fn notify(&self, event: &NotifyEvent) {
        if self.disabled {
            debug!("Notifications disabled, skipping event");
            return;
        }

        match self.send(event).await {
            Ok(()) => info!(success = event.is_success(), "✅ Feishu notification sent"),
            Err(e) => warn!(error = %e, "⚠️ Feishu notification failed"),
        }
    }

    async fn send(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        let token = self.tenant_access_token().await?;
        let card = Self::build_card(event);
        self.send_card(&token, &card).await
    }

    async fn tenant_access_token(&self) -> Result<String, NotifyError> {
        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, TOKEN_PATH))
            .json(&TokenRequest {
                app_id: &self.config.app_id,
                app_secret: &self.config.app_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Auth(format!("HTTP {}", status)));
        }

        let body = response.json::<TokenResponse>().await?;
        match (body.code, body.tenant_access_token) {
            (Some(0), Some(token)) if !token.is_empty() => Ok(token),
            (code, _) => Err(NotifyError::Auth(format!(
                "code {:?}: {}",
                code,
                body.msg.unwrap_or_default()
            ))),
        }
    }

    async fn send_card(&self, token: &str, card: &Card) -> Result<(), NotifyError> {
        let request = MessageRequest {
            receive_id: &self.config.chat_id,
            msg_type: "interactive",
            content: serde_json::to_string(card)?,
        };

        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, MESSAGE_PATH))
            .query(&[("receive_id_type", "chat_id")])
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<MessageResponse>().await?;
        if !status.is_success() || body.code != Some(0) {
            return Err(NotifyError::Rejected(format!(
                "HTTP {} code {:?}: {}",
                status,
                body.code,
                body.msg.unwrap_or_default()
            )));
        }

        Ok(())
    }

    /// Build the card for an event. Green for a published article, red for any failure.
    pub fn build_card(event: &NotifyEvent) -> Card {
        let (title, template) = match event {
            NotifyEvent::Published { .. } => ("🎉 每日简报发布成功", Template::Green),
            NotifyEvent::Failed { .. } => ("🚨 每日简报异常通知", Template::Red),
        };

        Card {
            config: CardConfig {
                wide_screen_mode: true,
            },
            elements: vec![CardElement {
                tag: "div",
                text: CardText {
                    tag: "lark_md",
                    content: Self::format_content(event),
                },
            }],
            header: CardHeader {
                title: CardText {
                    tag: "plain_text",
                    content: title.to_string(),
                },
                template,
            },
        }
    }

    fn format_content(event: &NotifyEvent) -> String {
        let timestamp = event.timestamp();
        let today = timestamp.format("%Y年%m月%d日");
        let time = timestamp.format("%Y-%m-%d %H:%M:%S");

        match event {
            NotifyEvent::Published {
                title,
                article_id,
                article_url,
                ..
            } => format!(
                "**📰 每日简报发布成功！**\n\n\
                📅 **日期：** {today}\n\
                📄 **标题：** {title}\n\
                🆔 **文章ID：** {article_id}\n\
                🔗 **文章链接：** {article_url}\n\
                ⏰ **发布时间：** {time}\n\n\
                ✅ 文章已成功发布到Emlog博客，读者可以查看最新的每日简报内容。"
            ),
            NotifyEvent::Failed { kind, message, .. } => {
                let label = kind.label();
                format!(
                    "**❌ 每日简报{label}！**\n\n\
                    📅 **日期：** {today}\n\
                    🚨 **错误类型：** {label}\n\
                    📝 **错误详情：** {message}\n\
                    ⏰ **发生时间：** {time}\n\n\
                    🔧 请检查相关配置和网络连接，确保服务正常运行。"
                )
            }
        }
    }
}
