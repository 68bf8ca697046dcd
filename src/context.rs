use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::config::TelegramConfig;
use crate::event::{ConversationKey, InboundEvent};
use crate::store::{ChatState, ChatStore};

/// Outcome of resolving conversation-scoped state for an event
#[derive(Debug, Clone)]
pub enum ChatLookup {
    /// The event has no conversation, or no store is configured
    NotApplicable,
    Found(ChatState),
    Unavailable(Arc<anyhow::Error>),
}

/// Everything a handler sees for one event. Built fresh per event.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub event: InboundEvent,
    pub config: Arc<TelegramConfig>,
    pub chat: ChatLookup,
}

impl ProcessingContext {
    /// Stored state of the event's chat. A store failure is reported here
    /// rather than swallowed.
    pub fn chat_state(&self) -> Result<Option<&ChatState>> {
        match &self.chat {
            ChatLookup::NotApplicable => Ok(None),
            ChatLookup::Found(state) => Ok(Some(state)),
            ChatLookup::Unavailable(err) => Err(anyhow::anyhow!("chat state unavailable: {:#}", err)),
        }
    }
}

/// Assembles [`ProcessingContext`]s from events, resolving stored chat state
#[derive(Clone)]
pub struct ContextBuilder {
    config: Arc<TelegramConfig>,
    store: Option<Arc<dyn ChatStore>>,
}

impl ContextBuilder {
    pub fn new(config: Arc<TelegramConfig>, store: Option<Arc<dyn ChatStore>>) -> Self {
        Self { config, store }
    }

    pub async fn build(&self, event: InboundEvent) -> ProcessingContext {
        let chat = match (event.conversation_key(), &self.store) {
            (Some(key), Some(store)) => match get_or_create(store.as_ref(), key).await {
                Ok(state) => ChatLookup::Found(state),
                Err(e) => {
                    warn!("Failed to resolve chat state for {}: {:#}", key, e);
                    ChatLookup::Unavailable(Arc::new(e))
                }
            },
            _ => ChatLookup::NotApplicable,
        };

        ProcessingContext {
            event,
            config: Arc::clone(&self.config),
            chat,
        }
    }
}

async fn get_or_create(store: &dyn ChatStore, key: ConversationKey) -> Result<ChatState> {
    if let Some(state) = store.get(key).await? {
        return Ok(state);
    }
    let state = ChatState::default();
    store.upsert(key, &state).await?;
    Ok(state)
}
