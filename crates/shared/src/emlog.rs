use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::config::EmlogConfig;
use crate::error::PipelineError;
use crate::http::RetryPolicy;
use crate::models::{Article, PublishResult};

#[derive(Debug, Deserialize)]
struct EmlogResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    // An object on success, often "" on failure
    #[serde(default)]
    data: Option<Value>,
}

/// Publishes articles through the Emlog REST API (`?rest-api=article_post`).
pub struct EmlogClient {
    client: Client,
    config: EmlogConfig,
    retry: RetryPolicy,
}

impl EmlogClient {
    pub fn new(client: Client, config: &EmlogConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config: config.clone(),
            retry,
        }
    }

    /// Public link to a published post.
    pub fn article_url(&self, article_id: &str) -> String {
        format!("{}/?post={}", self.config.domain, article_id)
    }

    pub async fn publish(&self, article: &Article) -> Result<PublishResult, PipelineError> {
        let author_uid = self.config.author_uid.to_string();
        let sort_id = self.config.sort_id.to_string();
        let form = [
            ("api_key", self.config.api_key.as_str()),
            ("title", article.title.as_str()),
            ("content", article.html_body.as_str()),
            ("author_uid", author_uid.as_str()),
            ("sort_id", sort_id.as_str()),
            ("draft", "n"),
            ("auto_cover", "y"),
        ];

        let request = self
            .client
            .post(format!("{}/", self.config.domain))
            .query(&[("rest-api", "article_post")])
            .header(reqwest::header::CONNECTION, "close")
            .form(&form);

        let response = self
            .retry
            .send(request)
            .await
            .map_err(|e| PipelineError::Publish(format!("request to Emlog failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(PipelineError::Publish(format!(
                "Emlog returned {} - {}",
                status, error_text
            )));
        }

        let body = response
            .json::<EmlogResponse>()
            .await
            .map_err(|e| PipelineError::Publish(format!("unreadable Emlog response: {}", e)))?;

        if body.code != Some(0) {
            let code = body
                .code
                .map_or_else(|| "missing".to_string(), |c| c.to_string());
            return Err(PipelineError::Publish(format!(
                "Emlog error {}: {}",
                code,
                body.msg.as_deref().unwrap_or("未知错误")
            )));
        }

        let article_id = body
            .data
            .and_then(|mut d| d.get_mut("article_id").map(Value::take))
            // Emlog returns a number, some plugins a string
            .and_then(|id| match id {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .ok_or_else(|| {
                PipelineError::Publish("Emlog response did not include an article_id".to_string())
            })?;

        info!(article_id = %article_id, "Article published");
        Ok(PublishResult { article_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use crate::http::build_client;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> EmlogClient {
        let config = EmlogConfig {
            domain: server.uri(),
            api_key: "secret-key".to_string(),
            author_uid: 1,
            sort_id: 2,
        };
        EmlogClient::new(
            build_client(&HttpSettings::default()).unwrap(),
            &config,
            RetryPolicy::none(),
        )
    }

    fn article() -> Article {
        Article {
            title: "每日简报 2025年08月03日 - 60秒读懂世界".to_string(),
            html_body: "<ol><li>1. A</li></ol>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_sends_form_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(query_param("rest-api", "article_post"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("api_key=secret-key"))
            .and(body_string_contains("author_uid=1"))
            .and(body_string_contains("sort_id=2"))
            .and(body_string_contains("draft=n"))
            .and(body_string_contains("auto_cover=y"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "msg": "ok",
                "data": {"article_id": 42}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).publish(&article()).await.unwrap();
        assert_eq!(result.article_id, "42");
    }

    #[tokio::test]
    async fn test_publish_accepts_string_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"article_id": "17"}
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).publish(&article()).await.unwrap();
        assert_eq!(result.article_id, "17");
    }

    #[tokio::test]
    async fn test_publish_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 1, "msg": "api_key error", "data": ""})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).publish(&article()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish(_)));
        assert!(err.message().contains("api_key error"));
    }

    #[tokio::test]
    async fn test_publish_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client_for(&server).publish(&article()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish(_)));
        assert!(err.message().contains("403"));
    }

    #[tokio::test]
    async fn test_publish_is_sent_once_when_gateway_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"article_id": 9}
            })))
            .expect(0)
            .mount(&server)
            .await;

        let config = EmlogConfig {
            domain: server.uri(),
            api_key: "secret-key".to_string(),
            author_uid: 1,
            sort_id: 2,
        };
        let retry = RetryPolicy {
            max_retries: 3,
            base_delay: std::time::Duration::from_millis(1),
        };
        let client = EmlogClient::new(build_client(&HttpSettings::default()).unwrap(), &config, retry);

        let err = client.publish(&article()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish(_)));
        assert!(err.message().contains("503"));
    }

    #[tokio::test]
    async fn test_publish_without_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
            .mount(&server)
            .await;

        let err = client_for(&server).publish(&article()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish(_)));
    }

    #[tokio::test]
    async fn test_article_url() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        assert_eq!(client.article_url("42"), format!("{}/?post=42", server.uri()));
    }
}
