use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotlinkError {
    /// Network failure or a non-200 response from the Bot API.
    #[error("Transport error{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    /// The platform answered but rejected the request (`"ok": false`).
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Certificate file error ({}): {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BotlinkError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BotlinkError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether retrying the same call may succeed. Only transport failures
    /// qualify; file, protocol and decode errors need a config or code change.
    pub fn is_transient(&self) -> bool {
        matches!(self, BotlinkError::Transport { .. })
    }
}

impl From<reqwest::Error> for BotlinkError {
    fn from(e: reqwest::Error) -> Self {
        BotlinkError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }
}

impl From<serde_json::Error> for BotlinkError {
    fn from(e: serde_json::Error) -> Self {
        BotlinkError::Decode(e.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, BotlinkError>;
