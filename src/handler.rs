use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::context::ProcessingContext;
use crate::event::{Command, InboundEvent};

/// Resolution tier. Higher tiers are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low = -1,
    Medium = 0,
    High = 1,
}

/// The effectful half of a handler.
#[async_trait]
pub trait Action: Send + Sync {
    /// Extra matching on top of the handler's event category. Must not have
    /// side effects; an error counts as "does not match".
    fn accepts(&self, _ctx: &ProcessingContext) -> Result<bool> {
        Ok(true)
    }

    async fn process(&self, ctx: &ProcessingContext) -> Result<()>;
}

/// Category of events a handler is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Messages whose leading command is the given one
    Command(Command),
    /// Inline keyboard button presses
    Callback,
    /// Inline queries
    Inline,
    /// Plain messages carrying no command
    Message,
}

impl HandlerKind {
    fn default_priority(self) -> Priority {
        match self {
            HandlerKind::Command(_) | HandlerKind::Callback | HandlerKind::Inline => Priority::High,
            HandlerKind::Message => Priority::Low,
        }
    }

    fn covers(self, event: &InboundEvent) -> bool {
        match (self, event) {
            (HandlerKind::Command(command), InboundEvent::Message(m)) => m.command == Some(command),
            (HandlerKind::Callback, InboundEvent::Callback(_)) => true,
            (HandlerKind::Inline, InboundEvent::InlineQuery(_)) => true,
            (HandlerKind::Message, InboundEvent::Message(m)) => m.command.is_none(),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct Handler {
    name: String,
    kind: HandlerKind,
    priority: Priority,
    action: Arc<dyn Action>,
}

impl Handler {
    pub fn new(name: impl Into<String>, kind: HandlerKind, action: Arc<dyn Action>) -> Self {
        Self {
            name: name.into(),
            kind,
            priority: kind.default_priority(),
            action,
        }
    }

    pub fn command(name: impl Into<String>, command: Command, action: Arc<dyn Action>) -> Self {
        Self::new(name, HandlerKind::Command(command), action)
    }

    pub fn callback(name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        Self::new(name, HandlerKind::Callback, action)
    }

    #[allow(dead_code)]
    pub fn inline(name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        Self::new(name, HandlerKind::Inline, action)
    }

    #[allow(dead_code)]
    pub fn message(name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        Self::new(name, HandlerKind::Message, action)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(dead_code)]
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn matches(&self, ctx: &ProcessingContext) -> Result<bool> {
        if !self.kind.covers(&ctx.event) {
            return Ok(false);
        }
        self.action.accepts(ctx)
    }

    pub async fn process(&self, ctx: &ProcessingContext) -> Result<()> {
        self.action.process(ctx).await
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish()
    }
}
