use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::certificate::{read_certificate, CertificateStore, FsCertificateStore};
use crate::config::Config;
use crate::error::{BotlinkError, Result};
use crate::transport::{HttpResponse, HttpTransport, MultipartForm, Transport};
use crate::types::{decode, ApiResponse, Update, UpdatesBatch, WebhookInfo};

/// Bot API base URL and token. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct BotIdentity {
    base_url: String,
    token: String,
}

impl BotIdentity {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `{base}/bot{token}/{method}`
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    /// Same as [`method_url`](Self::method_url) but safe to log.
    pub fn redacted_url(&self, method: &str) -> String {
        format!("{}/bot<redacted>/{method}", self.base_url)
    }
}

impl fmt::Debug for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotIdentity")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Uniform interface to the Bot API, independent of delivery mode.
///
/// Every operation is one request/response cycle. The gateway keeps no
/// offset, no retry state and no open connections; it is safe to share
/// behind an `Arc` across tasks.
pub struct Gateway {
    identity: BotIdentity,
    transport: Arc<dyn Transport>,
    certificates: Arc<dyn CertificateStore>,
}

impl Gateway {
    pub fn new(identity: BotIdentity, transport: Arc<dyn Transport>) -> Self {
        Self {
            identity,
            transport,
            certificates: Arc::new(FsCertificateStore),
        }
    }

    /// Build a gateway with the `reqwest` transport described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let identity = config.identity()?;
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self::new(identity, Arc::new(transport)))
    }

    pub fn with_certificate_store(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.certificates = store;
        self
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Point the platform at `callback_url`, uploading the certificate at
    /// `certificate_path`.
    pub async fn register_webhook(&self, callback_url: &str, certificate_path: &Path) -> Result<()> {
        self.set_webhook(callback_url, certificate_path, None).await
    }

    /// Like [`register_webhook`](Self::register_webhook), also asking the
    /// platform to send `secret` in the `X-Telegram-Bot-Api-Secret-Token`
    /// header of every push.
    pub async fn register_webhook_with_secret(
        &self,
        callback_url: &str,
        certificate_path: &Path,
        secret: &str,
    ) -> Result<()> {
        self.set_webhook(callback_url, certificate_path, Some(secret))
            .await
    }

    async fn set_webhook(
        &self,
        callback_url: &str,
        certificate_path: &Path,
        secret: Option<&str>,
    ) -> Result<()> {
        let content = read_certificate(&*self.certificates, certificate_path).map_err(|e| {
            error!("Failed to read certificate {}: {e}", certificate_path.display());
            BotlinkError::File {
                path: certificate_path.to_path_buf(),
                source: e,
            }
        })?;

        let file_name = certificate_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "certificate.pem".to_string());

        let mut form = MultipartForm::default().text("url", callback_url);
        if let Some(secret) = secret {
            form = form.text("secret_token", secret);
        }
        let form = form.file("certificate", &file_name, content);

        let url = url::Url::parse_with_params(
            &self.identity.method_url("setWebhook"),
            &[("url", callback_url)],
        )
        .map_err(|e| BotlinkError::Config(format!("invalid setWebhook URL: {e}")))?;

        debug!("POST {} (multipart)", self.identity.redacted_url("setWebhook"));

        let resp = self.transport.post_multipart(url.as_str(), form).await?;
        info!("setWebhook status code -> {}", resp.status);
        check_status("setWebhook", &resp)
    }

    /// Remove the webhook so updates become pollable again.
    pub async fn unregister_webhook(&self) -> Result<()> {
        debug!("POST {}", self.identity.redacted_url("deleteWebhook"));

        let resp = self
            .transport
            .post_form(&self.identity.method_url("deleteWebhook"), &[])
            .await?;
        info!("deleteWebhook status code -> {}", resp.status);
        check_status("deleteWebhook", &resp)
    }

    pub async fn webhook_status(&self) -> Result<WebhookInfo> {
        debug!("GET {}", self.identity.redacted_url("getWebhookInfo"));

        let resp = self
            .transport
            .get(&self.identity.method_url("getWebhookInfo"))
            .await?;
        check_status("getWebhookInfo", &resp)?;

        let envelope: ApiResponse<WebhookInfo> = decode(&resp.body).map_err(|e| {
            error!("Failed to decode getWebhookInfo response: {e}");
            e
        })?;

        envelope.result.ok_or_else(|| {
            BotlinkError::Decode(format!(
                "getWebhookInfo response has no result{}",
                describe(envelope.description.as_deref())
            ))
        })
    }

    /// Fetch updates with `update_id >= offset`, in platform order.
    pub async fn poll(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!("{}?offset={offset}", self.identity.method_url("getUpdates"));
        debug!("GET {}?offset={offset}", self.identity.redacted_url("getUpdates"));

        let resp = self.transport.get(&url).await?;
        let batch: UpdatesBatch = decode(&resp.body)?;

        if !batch.ok {
            warn!("getUpdates rejected (status {})", resp.status);
            return Err(BotlinkError::Protocol(format!(
                "platform rejected the poll request{}",
                describe(batch.description.as_deref())
            )));
        }

        let updates = batch.result.unwrap_or_default();
        debug!("getUpdates returned {} updates", updates.len());
        Ok(updates)
    }

    pub async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        debug!("POST {} chat_id={chat_id}", self.identity.redacted_url("sendMessage"));

        let form = [
            ("chat_id".to_string(), chat_id.to_string()),
            ("text".to_string(), text.to_string()),
        ];
        let resp = self
            .transport
            .post_form(&self.identity.method_url("sendMessage"), &form)
            .await?;
        info!("sendMessage status code -> {}", resp.status);
        check_status("sendMessage", &resp)
    }

    /// Decode a pushed webhook body. Shares the codec used by [`poll`](Self::poll).
    pub fn decode_update(&self, body: &[u8]) -> Result<Update> {
        decode(body)
    }
}

fn check_status(method: &str, resp: &HttpResponse) -> Result<()> {
    if resp.is_ok() {
        return Ok(());
    }

    let description = decode::<ApiResponse<serde_json::Value>>(&resp.body)
        .ok()
        .and_then(|r| r.description);
    warn!("{method} failed with status {}", resp.status);

    Err(BotlinkError::Transport {
        status: Some(resp.status),
        message: format!("{method} failed{}", describe(description.as_deref())),
    })
}

fn describe(description: Option<&str>) -> String {
    description.map(|d| format!(": {d}")).unwrap_or_default()
}
