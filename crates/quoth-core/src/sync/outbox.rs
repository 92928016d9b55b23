//! Outbox for newly created local quotes
//!
//! Each enqueued quote is pushed once, in order, by a background task. A
//! failed push is reported and dropped; it is never retried.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::engine::SyncEvent;
use crate::models::Quote;
use crate::remote::RemoteSource;

pub struct Outbox {
    tx: mpsc::UnboundedSender<Quote>,
    task: JoinHandle<()>,
}

impl Outbox {
    /// Spawn the push task
    pub fn spawn<R: RemoteSource>(remote: Arc<R>, events: mpsc::UnboundedSender<SyncEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(push_loop(remote, rx, events));
        Self { tx, task }
    }

    /// Queue a quote for pushing; returns false if the task has stopped
    pub fn enqueue(&self, quote: Quote) -> bool {
        debug!("Queued quote {} for push", quote.id);
        self.tx.send(quote).is_ok()
    }

    /// Stop accepting quotes and wait for queued pushes to finish
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!("Outbox task ended abnormally: {}", e);
        }
    }
}

async fn push_loop<R: RemoteSource>(
    remote: Arc<R>,
    mut rx: mpsc::UnboundedReceiver<Quote>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    while let Some(quote) = rx.recv().await {
        let event = match remote.push_quote(&quote).await {
            Ok(()) => SyncEvent::Pushed(quote.id),
            Err(e) => {
                warn!("Failed to push quote {}: {}", quote.id, e);
                SyncEvent::PushFailed {
                    id: quote.id,
                    error: e.to_string(),
                }
            }
        };
        let _ = events.send(event);
    }
}
