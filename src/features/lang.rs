use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{language_label, texts};
use crate::context::ProcessingContext;
use crate::event::ConversationKey;
use crate::handler::Action;
use crate::outbound::{Button, Keyboard, Messenger};
use crate::store::{ChatState, ChatStore, Language};

/// Payload carried by the language keyboard buttons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageChoice {
    #[serde(rename = "chat_language")]
    pub language: Language,
    /// The `/lang` message that opened the keyboard
    #[serde(rename = "message_id")]
    pub command_message_id: i32,
}

impl LanguageChoice {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to encode language choice")
    }

    pub fn decode(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("Callback data is not a language choice")
    }
}

/// Replies to `/lang` with one button per supported language
pub struct LanguageCommand {
    messenger: Arc<dyn Messenger>,
}

impl LanguageCommand {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    fn keyboard(command_message_id: i32) -> Result<Keyboard> {
        let rows = Language::ALL
            .into_iter()
            .map(|language| -> Result<Vec<Button>> {
                let choice = LanguageChoice {
                    language,
                    command_message_id,
                };
                Ok(vec![Button {
                    text: language_label(language).to_string(),
                    callback_data: choice.encode()?,
                }])
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Keyboard { rows })
    }
}

#[async_trait]
impl Action for LanguageCommand {
    async fn process(&self, ctx: &ProcessingContext) -> Result<()> {
        let message = ctx
            .event
            .as_message()
            .context("language command expects a message")?;

        let language = ctx
            .chat_state()
            .unwrap_or_else(|e| {
                warn!("Using default language for chat {}: {:#}", message.chat_id, e);
                None
            })
            .map(|s| s.language)
            .unwrap_or_default();

        let options = Language::ALL
            .into_iter()
            .map(language_label)
            .collect::<Vec<_>>()
            .join("\n");
        let text = format!("{}\n\n{}", texts(language).lang_title, options);

        self.messenger
            .send_message(
                message.chat_id,
                &text,
                Some(Self::keyboard(message.message_id)?),
            )
            .await?;

        info!("Sent language selection to chat {}", message.chat_id);
        Ok(())
    }
}

/// Stores the language picked on the `/lang` keyboard
pub struct LanguageCallback {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn ChatStore>,
}

impl LanguageCallback {
    pub fn new(messenger: Arc<dyn Messenger>, store: Arc<dyn ChatStore>) -> Self {
        Self { messenger, store }
    }
}

#[async_trait]
impl Action for LanguageCallback {
    fn accepts(&self, ctx: &ProcessingContext) -> Result<bool> {
        let callback = match ctx.event.as_callback() {
            Some(callback) => callback,
            None => return Ok(false),
        };
        LanguageChoice::decode(&callback.data)?;
        Ok(true)
    }

    async fn process(&self, ctx: &ProcessingContext) -> Result<()> {
        let callback = ctx
            .event
            .as_callback()
            .context("language callback expects a callback query")?;
        let chat_id = callback.chat_id;
        let choice = LanguageChoice::decode(&callback.data)?;

        let state = ChatState {
            language: choice.language,
        };
        if let Err(e) = self.store.upsert(ConversationKey(chat_id), &state).await {
            error!("Failed to store language for chat {}: {:#}", chat_id, e);
            if let Err(send_err) = self
                .messenger
                .send_message(chat_id, texts(Language::English).lang_error, None)
                .await
            {
                error!("Failed to send error message to chat {}: {:#}", chat_id, send_err);
            }
            return Err(e);
        }
        info!("Updated language for chat {} to {:?}", chat_id, choice.language);

        self.messenger
            .send_message(chat_id, texts(choice.language).lang_selected, None)
            .await?;

        for message_id in [choice.command_message_id, callback.message_id] {
            if let Err(e) = self.messenger.delete_message(chat_id, message_id).await {
                warn!(
                    "Failed to delete message {} in chat {}: {:#}",
                    message_id, chat_id, e
                );
            }
        }

        Ok(())
    }
}
