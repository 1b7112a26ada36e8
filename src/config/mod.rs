use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BotlinkError, Result};
use crate::gateway::BotIdentity;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

fn default_base_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
        }
    }
}

/// Client-side limits for Bot API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Callback URL registered with `setWebhook`.
    #[serde(default)]
    pub public_url: String,
    #[serde(default = "default_certificate")]
    pub certificate: PathBuf,
    #[serde(default)]
    pub secret_token: Option<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8443".to_string()
}
fn default_path() -> String {
    "/webhook".to_string()
}
fn default_certificate() -> PathBuf {
    PathBuf::from("server.pem")
}
fn default_max_body_bytes() -> usize {
    1024 * 1024 // 1 MB
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
            public_url: String::new(),
            certificate: default_certificate(),
            secret_token: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl WebhookConfig {
    /// Route path with a leading `/`.
    pub fn route_path(&self) -> String {
        let path = self.path.trim();
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }

    /// Configured secret, treating an empty string as unset.
    pub fn secret(&self) -> Option<&str> {
        self.secret_token.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BotlinkError::Config(format!("Failed to read config: {e}")))?;
        let content = substitute_env_vars(&content);
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".botlink")
            .join("config.toml")
    }

    pub fn identity(&self) -> Result<BotIdentity> {
        if self.bot.token.trim().is_empty() {
            return Err(BotlinkError::Config(
                "bot.token is empty (set it or BOTLINK_BOT_TOKEN)".to_string(),
            ));
        }
        url::Url::parse(&self.bot.base_url).map_err(|e| {
            BotlinkError::Config(format!("Invalid bot.base_url '{}': {e}", self.bot.base_url))
        })?;
        Ok(BotIdentity::new(&self.bot.base_url, self.bot.token.trim()))
    }

    pub fn default_toml() -> &'static str {
        r#"[bot]
base_url = "https://api.telegram.org"
token = "${BOTLINK_BOT_TOKEN}"

[transport]
timeout_secs = 30
connect_timeout_secs = 10

[webhook]
bind = "0.0.0.0:8443"
path = "/webhook"
# Callback URL the platform pushes updates to
public_url = ""
certificate = "server.pem"
# secret_token = "${BOTLINK_WEBHOOK_SECRET}"
max_body_bytes = 1048576

[polling]
interval_ms = 1000
"#
    }
}

/// Substitute `${VAR_NAME}` patterns with environment variable values.
pub fn substitute_env_vars(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    });
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .to_string()
}
