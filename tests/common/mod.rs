//! Common test utilities: an in-memory transport and certificate store.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use botlink::certificate::{CertificateHandle, CertificateStore};
use botlink::error::{BotlinkError, Result};
use botlink::transport::{HttpResponse, MultipartForm, Transport};
use botlink::{BotIdentity, Gateway};

pub const BASE_URL: &str = "http://bot.test";
pub const TOKEN: &str = "123:abc";

/// A request as seen by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Get {
        url: String,
    },
    Form {
        url: String,
        fields: Vec<(String, String)>,
    },
    Multipart {
        url: String,
        form: MultipartForm,
    },
}

impl Recorded {
    pub fn url(&self) -> &str {
        match self {
            Recorded::Get { url } | Recorded::Form { url, .. } | Recorded::Multipart { url, .. } => {
                url
            }
        }
    }
}

enum Reply {
    Respond(u16, String),
    Fail(String),
}

/// Records requests and answers them from a queue. An empty queue answers
/// `200 {"ok":true,"result":[]}`.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Respond(status, body.to_string()));
    }

    pub fn fail(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Fail(message.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, request: Recorded) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Fail(message)) => Err(BotlinkError::Transport {
                status: None,
                message,
            }),
            None => Ok(HttpResponse::new(200, r#"{"ok":true,"result":[]}"#)),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.answer(Recorded::Get {
            url: url.to_string(),
        })
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse> {
        self.answer(Recorded::Form {
            url: url.to_string(),
            fields: form.to_vec(),
        })
    }

    async fn post_multipart(&self, url: &str, form: MultipartForm) -> Result<HttpResponse> {
        self.answer(Recorded::Multipart {
            url: url.to_string(),
            form,
        })
    }
}

/// Certificate store handing out counted handles.
#[derive(Default)]
pub struct FakeCertificateStore {
    pub content: Vec<u8>,
    pub fail_open: bool,
    pub fail_read: bool,
    pub opened: Arc<AtomicUsize>,
    pub live_handles: Arc<AtomicUsize>,
}

impl FakeCertificateStore {
    pub fn with_content(content: &str) -> Self {
        Self {
            content: content.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }
}

struct FakeHandle {
    content: Cursor<Vec<u8>>,
    fail_read: bool,
    live_handles: Arc<AtomicUsize>,
}

impl Read for FakeHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.fail_read {
            return Err(std::io::Error::other("simulated read failure"));
        }
        self.content.read(buf)
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CertificateStore for FakeCertificateStore {
    fn open(&self, _path: &Path) -> std::io::Result<CertificateHandle> {
        if self.fail_open {
            return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            content: Cursor::new(self.content.clone()),
            fail_read: self.fail_read,
            live_handles: self.live_handles.clone(),
        }))
    }
}

pub fn test_gateway(transport: &Arc<FakeTransport>) -> Gateway {
    Gateway::new(BotIdentity::new(BASE_URL, TOKEN), transport.clone())
}

pub fn method_url(method: &str) -> String {
    format!("{BASE_URL}/bot{TOKEN}/{method}")
}

pub const SAMPLE_UPDATE: &str = r#"{"update_id":1,"message":{"message_id":2,"from":{"id":3,"first_name":"A","username":"a"},"chat":{"id":4},"text":"hi"}}"#;

pub fn update_json(update_id: i64, text: &str) -> String {
    format!(
        r#"{{"update_id":{update_id},"message":{{"message_id":{update_id},"from":{{"id":3,"first_name":"A","username":"a"}},"chat":{{"id":4}},"text":"{text}"}}}}"#
    )
}
