//! The reqwest transport against a local HTTP server.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Router;

use botlink::config::TransportConfig;
use botlink::error::BotlinkError;
use botlink::transport::HttpTransport;
use botlink::{BotIdentity, Gateway};

const TOKEN: &str = "123:abc";

#[derive(Debug, Clone)]
struct Seen {
    path_and_query: String,
    content_type: String,
    body: String,
}

type Log = Arc<Mutex<Vec<Seen>>>;

async fn record(
    State(log): State<Log>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    log.lock().unwrap().push(Seen {
        path_and_query: uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default(),
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    if uri.path().ends_with("/deleteWebhook") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"ok":false,"description":"Internal Server Error"}"#.to_string(),
        );
    }
    (StatusCode::OK, r#"{"ok":true,"result":true}"#.to_string())
}

/// Start a recording server on an ephemeral port and return a gateway
/// pointed at it.
async fn serve() -> (Gateway, Log) {
    let log: Log = Arc::default();
    let app = Router::new().fallback(record).with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
    let identity = BotIdentity::new(&format!("http://{addr}"), TOKEN);
    (Gateway::new(identity, Arc::new(transport)), log)
}

#[tokio::test]
async fn test_http_500_becomes_transport_error() {
    let (gateway, log) = serve().await;

    let err = gateway.unregister_webhook().await.unwrap_err();

    assert!(
        matches!(
            err,
            BotlinkError::Transport {
                status: Some(500),
                ..
            }
        ),
        "got {err:?}"
    );
    assert!(err.to_string().contains("Internal Server Error"));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_send_posts_urlencoded_form() {
    let (gateway, log) = serve().await;

    gateway.send(-42, "hello & bye").await.unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path_and_query, format!("/bot{TOKEN}/sendMessage"));
    assert!(seen[0]
        .content_type
        .starts_with("application/x-www-form-urlencoded"));
    assert_eq!(seen[0].body, "chat_id=-42&text=hello+%26+bye");
}

#[tokio::test]
async fn test_set_webhook_encodes_query_and_multipart() {
    let (gateway, log) = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let cert = dir.path().join("server.pem");
    std::fs::write(&cert, "-----BEGIN CERTIFICATE-----").unwrap();

    gateway
        .register_webhook("https://ex.com/h?a=1&b=2", &cert)
        .await
        .unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].path_and_query,
        format!("/bot{TOKEN}/setWebhook?url=https%3A%2F%2Fex.com%2Fh%3Fa%3D1%26b%3D2")
    );
    assert!(seen[0].content_type.starts_with("multipart/form-data; boundary="));

    let body = &seen[0].body;
    assert!(body.contains(r#"name="url""#));
    assert!(body.contains("https://ex.com/h?a=1&b=2"));
    assert!(body.contains(r#"name="certificate"; filename="server.pem""#));
    assert!(body.contains("-----BEGIN CERTIFICATE-----"));
}
