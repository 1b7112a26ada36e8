use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::config::TransportConfig;
use crate::error::{BotlinkError, Result};

/// Raw response: status code plus the fully read body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A file attached to a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Transport-neutral multipart body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: Vec<u8>) -> Self {
        self.files.push(FilePart {
            name: name.to_string(),
            file_name: file_name.to_string(),
            content,
        });
        self
    }
}

/// Outbound HTTP seam used by the gateway.
///
/// Implementations return `Ok` for any HTTP status; only failures to complete
/// the exchange (connect, timeout, body read) are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse>;

    async fn post_multipart(&self, url: &str, form: MultipartForm) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| BotlinkError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    async fn finish(resp: reqwest::Response) -> Result<HttpResponse> {
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let resp = self.http.get(url).send().await?;
        Self::finish(resp).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse> {
        let resp = self.http.post(url).form(form).send().await?;
        Self::finish(resp).await
    }

    async fn post_multipart(&self, url: &str, form: MultipartForm) -> Result<HttpResponse> {
        let mut body = Form::new();
        for (name, value) in form.fields {
            body = body.text(name, value);
        }
        for file in form.files {
            body = body.part(file.name, Part::bytes(file.content).file_name(file.file_name));
        }
        let resp = self.http.post(url).multipart(body).send().await?;
        Self::finish(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_builder() {
        let form = MultipartForm::default()
            .text("url", "https://example.com/hook")
            .file("certificate", "server.pem", b"PEM".to_vec());
        assert_eq!(
            form.fields,
            vec![("url".to_string(), "https://example.com/hook".to_string())]
        );
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].name, "certificate");
        assert_eq!(form.files[0].file_name, "server.pem");
        assert_eq!(form.files[0].content, b"PEM");
    }

    #[test]
    fn test_response_helpers() {
        let resp = HttpResponse::new(200, r#"{"ok":true}"#);
        assert!(resp.is_ok());
        assert_eq!(resp.text(), r#"{"ok":true}"#);
        assert!(!HttpResponse::new(201, "").is_ok());
    }

    #[test]
    fn test_http_transport_builds() {
        let config = TransportConfig::default();
        assert!(HttpTransport::new(&config).is_ok());
    }
}
