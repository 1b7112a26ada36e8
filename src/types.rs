//! Bot API wire types.
//!
//! Field names follow the platform's JSON exactly; they are fixed by the
//! external API, not by this crate.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{BotlinkError, Result};

/// Standard Bot API response envelope: `{"ok": bool, "result": T}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response body of `getUpdates`.
pub type UpdatesBatch = ApiResponse<Vec<Update>>;

/// One inbound message event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Assigned by the platform, increasing across updates.
    pub update_id: i64,
    pub message: Message,
}

impl Update {
    pub fn chat_id(&self) -> i64 {
        self.message.chat.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Absent for channel posts.
    #[serde(default)]
    pub from: User,
    pub chat: Chat,
    /// Absent for non-text messages (photos, stickers, ...).
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Snapshot of the platform-side webhook registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub url: String,
    pub has_custom_certificate: bool,
    pub pending_update_count: i64,
}

/// Decode a JSON body, mapping any failure to [`BotlinkError::Decode`].
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| BotlinkError::Decode(e.to_string()))
}
