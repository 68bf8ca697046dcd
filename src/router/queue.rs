use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Inner;
use crate::event::{ConversationKey, InboundEvent};

/// Pending events of one conversation plus the handle of its worker.
///
/// `pending` counts events that were sent but not yet fully handled; it only
/// changes while the owning map shard is locked (increment) or in the worker
/// (decrement), which is what makes idle eviction race-free.
pub(super) struct ConversationQueue {
    pub(super) id: u64,
    sender: mpsc::UnboundedSender<InboundEvent>,
    pending: Arc<AtomicUsize>,
    worker: JoinHandle<()>,
}

impl ConversationQueue {
    /// Create the queue and start its worker on the current runtime
    pub(super) fn spawn(inner: Arc<Inner>, key: ConversationKey, id: u64) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        debug!("Creating conversation queue {} for chat {}", id, key);
        let worker = tokio::spawn(run_worker(inner, key, id, receiver, Arc::clone(&pending)));

        Self {
            id,
            sender,
            pending,
            worker,
        }
    }

    /// A queue whose worker has already stopped
    #[cfg(test)]
    pub(super) fn detached(id: u64) -> Self {
        let (sender, _) = mpsc::unbounded_channel();
        Self {
            id,
            sender,
            pending: Arc::new(AtomicUsize::new(0)),
            worker: tokio::spawn(async {}),
        }
    }

    /// Close the channel and hand back the worker so the caller can wait for
    /// it to drain.
    pub(super) fn close(self) -> JoinHandle<()> {
        self.worker
    }

    /// Enqueue without waiting. Hands the event back if the worker is gone.
    pub(super) fn push(&self, event: InboundEvent) -> Result<(), InboundEvent> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.sender.send(event).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            e.0
        })
    }

    pub(super) fn is_idle(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }
}

async fn run_worker(
    inner: Arc<Inner>,
    key: ConversationKey,
    id: u64,
    mut receiver: mpsc::UnboundedReceiver<InboundEvent>,
    pending: Arc<AtomicUsize>,
) {
    loop {
        let next = match inner.settings.idle_timeout {
            Some(idle) => match tokio::time::timeout(idle, receiver.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    // Dropping our entry closes the channel; the next recv
                    // then yields None and the loop ends.
                    let evicted = inner
                        .queues
                        .remove_if(&key, |_, queue| queue.id == id && queue.is_idle())
                        .is_some();
                    if evicted {
                        debug!("Evicted idle conversation queue {} for chat {}", id, key);
                    }
                    continue;
                }
            },
            None => receiver.recv().await,
        };

        let Some(event) = next else {
            break;
        };

        inner.handle(event).await;
        pending.fetch_sub(1, Ordering::SeqCst);
    }

    debug!("Conversation worker {} for chat {} stopped", id, key);
}
