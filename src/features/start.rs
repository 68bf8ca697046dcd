use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::texts;
use crate::context::ProcessingContext;
use crate::handler::Action;
use crate::outbound::Messenger;

/// Greets the chat in its stored language
pub struct StartCommand {
    messenger: Arc<dyn Messenger>,
}

impl StartCommand {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl Action for StartCommand {
    async fn process(&self, ctx: &ProcessingContext) -> Result<()> {
        let message = ctx
            .event
            .as_message()
            .context("start command expects a message")?;

        let language = match ctx.chat_state() {
            Ok(state) => state.map(|s| s.language).unwrap_or_default(),
            Err(e) => {
                warn!("Greeting chat {} in the default language: {:#}", message.chat_id, e);
                Default::default()
            }
        };
        let texts = texts(language);

        let text = format!("{}\n\n{}", texts.start_welcome, texts.start_instructions);
        self.messenger
            .send_message(message.chat_id, &text, None)
            .await?;

        info!(
            "Sent start message from @{} to chat {}",
            ctx.config.bot_username, message.chat_id
        );
        Ok(())
    }
}
