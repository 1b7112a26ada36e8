use std::future::Future;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{BotlinkError, Result};
use crate::types::Update;

/// Receives decoded updates from either delivery mode.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, update: Update) -> Result<()>;
}

/// Forward updates into a channel, so webhook and polling feed one stream.
#[async_trait]
impl UpdateHandler for mpsc::Sender<Update> {
    async fn handle(&self, update: Update) -> Result<()> {
        self.send(update)
            .await
            .map_err(|_| BotlinkError::Handler("update receiver dropped".to_string()))
    }
}

pub struct HandlerFn<F>(F);

/// Wrap an async closure as an [`UpdateHandler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Update) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> UpdateHandler for HandlerFn<F>
where
    F: Fn(Update) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, update: Update) -> Result<()> {
        (self.0)(update).await
    }
}
