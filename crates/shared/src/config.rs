use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_EMLOG_DOMAIN: &str = "https://emlog.example.com";
const DEFAULT_EMLOG_API_KEY: &str = "xxxxxxxxxxxxxxxxxxxxxx";
const DEFAULT_ALAPI_TOKEN: &str = "xxxxxxxxxxxxxxxx";
const DEFAULT_ALAPI_URL: &str = "https://v3.alapi.cn/api/zaobao";
const DEFAULT_FEISHU_APP_ID: &str = "cli_xxxxxxxxxxxxxxx";
const DEFAULT_FEISHU_APP_SECRET: &str = "xxxxxxxxxxxxxxxxxxxxxx";
const DEFAULT_FEISHU_CHAT_ID: &str = "oc_xxxxxxxxxxxxxxxxxxxxxxxxxxxx";
const DEFAULT_FEISHU_BASE_URL: &str = "https://open.feishu.cn";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct EmlogConfig {
    /// Blog root, without trailing slash
    pub domain: String,
    pub api_key: String,
    pub author_uid: u32,
    pub sort_id: u32,
}

#[derive(Debug, Clone)]
pub struct AlapiConfig {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct FeishuConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_secret: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Skip TLS certificate verification. Off unless explicitly requested.
    pub insecure_tls: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            insecure_tls: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub emlog: EmlogConfig,
    pub alapi: AlapiConfig,
    pub feishu: FeishuConfig,
    pub http: HttpSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let string_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let emlog = EmlogConfig {
            domain: string_or("EMLOG_DOMAIN", DEFAULT_EMLOG_DOMAIN)
                .trim_end_matches('/')
                .to_string(),
            api_key: string_or("EMLOG_API_KEY", DEFAULT_EMLOG_API_KEY),
            author_uid: parse_or(get("EMLOG_AUTHOR_UID"), "EMLOG_AUTHOR_UID", 1)?,
            sort_id: parse_or(get("EMLOG_SORT_ID"), "EMLOG_SORT_ID", 2)?,
        };

        url::Url::parse(&emlog.domain)
            .with_context(|| format!("EMLOG_DOMAIN is not a valid URL: {}", emlog.domain))?;

        let alapi = AlapiConfig {
            url: string_or("ALAPI_URL", DEFAULT_ALAPI_URL),
            token: string_or("ALAPI_TOKEN", DEFAULT_ALAPI_TOKEN),
        };

        let feishu = FeishuConfig {
            base_url: string_or("FEISHU_BASE_URL", DEFAULT_FEISHU_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            app_id: string_or("FEISHU_APP_ID", DEFAULT_FEISHU_APP_ID),
            app_secret: string_or("FEISHU_APP_SECRET", DEFAULT_FEISHU_APP_SECRET),
            chat_id: string_or("FEISHU_CHAT_ID", DEFAULT_FEISHU_CHAT_ID),
        };

        let timeout_secs = parse_or(
            get("BRIEFING_HTTP_TIMEOUT_SECS"),
            "BRIEFING_HTTP_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?;
        let http = HttpSettings {
            timeout: Duration::from_secs(timeout_secs),
            insecure_tls: get("BRIEFING_INSECURE_TLS")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        };

        Ok(Self {
            emlog,
            alapi,
            feishu,
            http,
        })
    }

    /// Variables still holding their built-in placeholder value.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let checks = [
            ("EMLOG_DOMAIN", self.emlog.domain == DEFAULT_EMLOG_DOMAIN),
            ("EMLOG_API_KEY", self.emlog.api_key == DEFAULT_EMLOG_API_KEY),
            ("ALAPI_TOKEN", self.alapi.token == DEFAULT_ALAPI_TOKEN),
            ("FEISHU_APP_ID", self.feishu.app_id == DEFAULT_FEISHU_APP_ID),
            (
                "FEISHU_APP_SECRET",
                self.feishu.app_secret == DEFAULT_FEISHU_APP_SECRET,
            ),
            ("FEISHU_CHAT_ID", self.feishu.chat_id == DEFAULT_FEISHU_CHAT_ID),
        ];

        checks
            .into_iter()
            .filter_map(|(name, is_default)| is_default.then_some(name))
            .collect()
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/daily-briefing/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("daily-briefing").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - the scheduler may set variables directly
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, v)),
        None => Ok(default),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
