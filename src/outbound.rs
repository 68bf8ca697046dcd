use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

/// One inline keyboard button
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

/// Rows of inline buttons attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    fn to_markup(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(self.rows.iter().map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.text.clone(), b.callback_data.clone()))
                .collect::<Vec<_>>()
        }))
    }
}

/// Outbound actions handlers can take on the chat platform
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML message, returning the id of the new message
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>)
        -> Result<i32>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;
}

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard.to_markup());
        }

        let message = request
            .await
            .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        Ok(message.id.0)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .with_context(|| {
                format!("Failed to delete message {} in chat {}", message_id, chat_id)
            })?;
        Ok(())
    }
}
