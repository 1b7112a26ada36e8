//! Webhook endpoint: one pushed HTTP request in, one decoded update out.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::FutureExt;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::gateway::Gateway;
use crate::handler::UpdateHandler;

/// Header the platform uses to echo the secret given at registration.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub handler: Arc<dyn UpdateHandler>,
    pub webhook_path: String,
    pub secret_token: Option<String>,
    pub max_body_bytes: usize,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn receive_update(State(state): State<Arc<AppState>>, body: Body) -> Response {
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read webhook body: {e}");
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    let update = match state.gateway.decode_update(&bytes) {
        Ok(update) => update,
        Err(e) => {
            error!("Failed to decode webhook update: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process JSON").into_response();
        }
    };

    info!(
        "webhook update {} message -> {}",
        update.update_id, update.message.text
    );

    match AssertUnwindSafe(state.handler.handle(update))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => StatusCode::OK.into_response(),
        Ok(Err(e)) => {
            error!("Update handler failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(_) => {
            error!("Update handler panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn secret_middleware(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    if let Some(expected) = &state.secret_token {
        let provided = request
            .headers()
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        if provided != Some(expected.as_str()) {
            warn!("Rejected webhook push with missing or wrong secret token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }
    next.run(request).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let webhook = Router::new()
        .route(&state.webhook_path, post(receive_update))
        .layer(middleware::from_fn_with_state(state.clone(), secret_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
