use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

use crate::context::ProcessingContext;
use crate::handler::Handler;

/// Ordered, immutable set of handlers. Resolution is first-match-wins over
/// descending priority, ties kept in registration order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Handler>,
}

#[derive(Debug, Default)]
pub struct HandlerRegistryBuilder {
    handlers: Vec<Handler>,
}

impl HandlerRegistryBuilder {
    pub fn register(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(mut self) -> HandlerRegistry {
        // sort_by is stable, so equal tiers keep registration order
        self.handlers
            .sort_by(|a, b| b.priority().cmp(&a.priority()));
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handlers in resolution order
    pub fn iter(&self) -> impl Iterator<Item = &Handler> {
        self.handlers.iter()
    }

    /// Find the handler for `ctx`. A predicate that errors or panics is
    /// treated as not matching.
    pub fn resolve(&self, ctx: &ProcessingContext) -> Option<&Handler> {
        self.handlers.iter().find(|handler| {
            match catch_unwind(AssertUnwindSafe(|| handler.matches(ctx))) {
                Ok(Ok(matched)) => matched,
                Ok(Err(e)) => {
                    debug!(
                        "Handler '{}' predicate failed for update {}: {:#}",
                        handler.name(),
                        ctx.event.update_id(),
                        e
                    );
                    false
                }
                Err(_) => {
                    debug!(
                        "Handler '{}' predicate panicked for update {}",
                        handler.name(),
                        ctx.event.update_id()
                    );
                    false
                }
            }
        })
    }
}
