use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{UpdateKind, User};
use tracing::info;

use crate::event::{
    CallbackEvent, Command, InboundEvent, InlineQueryEvent, IntoInboundEvent, MessageEvent,
};
use crate::router::Router;

impl IntoInboundEvent for Update {
    fn into_inbound(self, bot_username: &str) -> Option<InboundEvent> {
        let update_id = self.id.0;

        match self.kind {
            UpdateKind::Message(msg) => {
                let text = msg.text().unwrap_or_default().to_string();
                Some(InboundEvent::Message(MessageEvent {
                    update_id,
                    chat_id: msg.chat.id.0,
                    message_id: msg.id.0,
                    command: Command::parse(&text, bot_username),
                    text,
                    sender_name: msg.from.as_ref().map(display_name).unwrap_or_default(),
                }))
            }
            UpdateKind::CallbackQuery(query) => {
                // Callbacks on messages too old to be accessible still carry
                // their chat; callbacks from inline messages carry none.
                let message = query.message.as_ref()?;
                Some(InboundEvent::Callback(CallbackEvent {
                    update_id,
                    query_id: query.id.to_string(),
                    chat_id: message.chat().id.0,
                    message_id: message.id().0,
                    data: query.data.clone().unwrap_or_default(),
                }))
            }
            UpdateKind::InlineQuery(query) => Some(InboundEvent::InlineQuery(InlineQueryEvent {
                update_id,
                query_id: query.id.to_string(),
                query: query.query,
            })),
            _ => None,
        }
    }
}

fn display_name(user: &User) -> String {
    user.first_name.clone()
}

/// Run long polling and feed every update into the router
pub async fn run(bot: Bot, router: Router) -> Result<()> {
    info!(
        "Starting Telegram platform with {} handler(s)...",
        router.handler_count()
    );

    let handler = dptree::endpoint(forward_update);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router.clone()])
        .enable_ctrlc_handler()
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    router.shutdown().await;
    info!("Telegram platform stopped; router stats: {:?}", router.stats());
    Ok(())
}

async fn forward_update(update: Update, router: Router) -> ResponseResult<()> {
    router.submit(update);
    Ok(())
}
