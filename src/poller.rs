//! Offset-tracking loop over [`Gateway::poll`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::gateway::Gateway;
use crate::handler::UpdateHandler;
use crate::types::Update;

/// Polls from a starting offset and advances it after each successful batch.
///
/// Delivery is at-least-once: the offset only moves past updates that were
/// returned, and a failed poll leaves it where it was. Persist [`offset`]
/// to resume later.
///
/// [`offset`]: Poller::offset
pub struct Poller {
    gateway: Arc<Gateway>,
    offset: i64,
}

impl Poller {
    pub fn new(gateway: Arc<Gateway>, offset: i64) -> Self {
        Self { gateway, offset }
    }

    /// Next offset to request.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub async fn next_batch(&mut self) -> Result<Vec<Update>> {
        let updates = self.gateway.poll(self.offset).await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset = self.offset.max(last.saturating_add(1));
        }
        Ok(updates)
    }

    /// Lazy stream of batches. Never sleeps or retries on its own; errors are
    /// yielded and the following item re-polls the same offset.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Update>>> {
        futures::stream::unfold(self, |mut poller| async move {
            let batch = poller.next_batch().await;
            Some((batch, poller))
        })
    }

    /// Forward every update to `handler` until `shutdown` resolves or the
    /// handler fails. Returns the offset to resume from.
    ///
    /// Waits `interval` after an empty batch or a failed poll.
    pub async fn run<F>(mut self, handler: &dyn UpdateHandler, interval: Duration, shutdown: F) -> i64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Polling for updates from offset {}", self.offset);

        loop {
            let batch = tokio::select! {
                _ = &mut shutdown => break,
                batch = self.next_batch() => batch,
            };

            let pause = match batch {
                Ok(updates) if updates.is_empty() => true,
                Ok(updates) => {
                    debug!("Dispatching {} updates", updates.len());
                    for update in updates {
                        let id = update.update_id;
                        if let Err(e) = handler.handle(update).await {
                            error!("Update handler failed on update {id}: {e}");
                            self.offset = id;
                            return self.offset;
                        }
                    }
                    false
                }
                Err(e) => {
                    warn!("Poll at offset {} failed: {e}", self.offset);
                    true
                }
            };

            if pause {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        info!("Polling stopped at offset {}", self.offset);
        self.offset
    }
}
