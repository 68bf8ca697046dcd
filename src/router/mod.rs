mod queue;

use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::DispatcherConfig;
use crate::context::ContextBuilder;
use crate::event::{ConversationKey, InboundEvent, IntoInboundEvent};
use crate::registry::HandlerRegistry;
use queue::ConversationQueue;

#[derive(Debug, Clone, Default)]
pub struct RouterSettings {
    /// Evict conversation queues idle for this long. `None` keeps them forever.
    pub idle_timeout: Option<Duration>,
}

impl From<&DispatcherConfig> for RouterSettings {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Point-in-time copy of the router counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub unrecognized: u64,
    pub processed: u64,
    pub failed: u64,
    pub unmatched: u64,
}

#[derive(Default)]
struct DispatchStats {
    accepted: AtomicU64,
    unrecognized: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    unmatched: AtomicU64,
}

impl DispatchStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
        }
    }
}

struct Inner {
    registry: HandlerRegistry,
    contexts: ContextBuilder,
    settings: RouterSettings,
    bot_username: String,
    queues: DashMap<ConversationKey, ConversationQueue>,
    next_queue_id: AtomicU64,
    stats: DispatchStats,
}

/// Routes inbound events to per-conversation queues and, from there, to
/// exactly one handler each.
///
/// Events of one chat are handled strictly one after another in submission
/// order; different chats run in parallel. A failing or panicking handler is
/// logged and never takes down its worker, other workers or the router.
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

impl Router {
    pub fn new(
        registry: HandlerRegistry,
        contexts: ContextBuilder,
        settings: RouterSettings,
        bot_username: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                contexts,
                settings,
                bot_username: bot_username.into(),
                queues: DashMap::new(),
                next_queue_id: AtomicU64::new(1),
                stats: DispatchStats::default(),
            }),
        }
    }

    /// Accept a raw update. Never waits for processing; must be called from
    /// within a tokio runtime.
    pub fn submit<R: IntoInboundEvent>(&self, raw: R) {
        let Some(event) = raw.into_inbound(&self.inner.bot_username) else {
            DispatchStats::bump(&self.inner.stats.unrecognized);
            debug!("Dropping update with no recognizable event");
            return;
        };
        DispatchStats::bump(&self.inner.stats.accepted);

        match event.conversation_key() {
            Some(key) => self.enqueue(key, event),
            None => {
                debug!(
                    "Dispatching {} update {} without conversation",
                    event.kind(),
                    event.update_id()
                );
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move { inner.handle(event).await });
            }
        }
    }

    fn enqueue(&self, key: ConversationKey, event: InboundEvent) {
        let (queue_id, event) = {
            let queue = self.queue_for(key);
            match queue.push(event) {
                Ok(()) => return,
                Err(event) => (queue.id, event),
            }
        };

        // The worker is gone; replace its queue and try once more
        self.inner
            .queues
            .remove_if(&key, |_, queue| queue.id == queue_id);
        if let Err(event) = self.queue_for(key).push(event) {
            error!(
                "Dropping {} update {} for chat {}: conversation worker unavailable",
                event.kind(),
                event.update_id(),
                key
            );
        }
    }

    fn queue_for(
        &self,
        key: ConversationKey,
    ) -> dashmap::mapref::one::RefMut<'_, ConversationKey, ConversationQueue> {
        self.inner.queues.entry(key).or_insert_with(|| {
            let id = self.inner.next_queue_id.fetch_add(1, Ordering::Relaxed);
            ConversationQueue::spawn(Arc::clone(&self.inner), key, id)
        })
    }

    /// Number of conversations that currently own a queue and worker
    pub fn active_conversations(&self) -> usize {
        self.inner.queues.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn handler_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Close every conversation queue and wait until the workers have handled
    /// what was already buffered. Events submitted meanwhile start new queues.
    pub async fn shutdown(&self) {
        let keys: Vec<ConversationKey> = self.inner.queues.iter().map(|e| *e.key()).collect();
        info!("Closing {} conversation queue(s)", keys.len());

        let workers: Vec<_> = keys
            .into_iter()
            .filter_map(|key| self.inner.queues.remove(&key))
            .map(|(_, queue)| queue.close())
            .collect();

        for result in join_all(workers).await {
            if let Err(e) = result {
                warn!("Conversation worker did not stop cleanly: {}", e);
            }
        }
    }
}

impl Inner {
    /// Handle one event. Nothing that happens here, a panic included, escapes
    /// to the caller.
    async fn handle(&self, event: InboundEvent) {
        let origin = describe(&event);
        if let Err(panic) = AssertUnwindSafe(self.dispatch(event)).catch_unwind().await {
            DispatchStats::bump(&self.stats.failed);
            error!(
                "Panicked while handling {}: {}",
                origin,
                panic_message(panic.as_ref())
            );
        }
    }

    async fn dispatch(&self, event: InboundEvent) {
        let ctx = self.contexts.build(event).await;
        let origin = describe(&ctx.event);

        let Some(handler) = self.registry.resolve(&ctx) else {
            DispatchStats::bump(&self.stats.unmatched);
            info!("No handler for {}; dropping", origin);
            return;
        };

        debug!("Handler '{}' selected for {}", handler.name(), origin);

        match AssertUnwindSafe(handler.process(&ctx)).catch_unwind().await {
            Ok(Ok(())) => {
                DispatchStats::bump(&self.stats.processed);
            }
            Ok(Err(e)) => {
                DispatchStats::bump(&self.stats.failed);
                error!(
                    "Handler '{}' failed on {}: {:#} (event: {:?})",
                    handler.name(),
                    origin,
                    e,
                    ctx.event
                );
            }
            Err(panic) => {
                DispatchStats::bump(&self.stats.failed);
                error!(
                    "Handler '{}' panicked on {}: {} (event: {:?})",
                    handler.name(),
                    origin,
                    panic_message(panic.as_ref()),
                    ctx.event
                );
            }
        }
    }
}

fn describe(event: &InboundEvent) -> String {
    match event.conversation_key() {
        Some(key) => format!("{} update {} in chat {}", event.kind(), event.update_id(), key),
        None => format!("{} update {}", event.kind(), event.update_id()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
