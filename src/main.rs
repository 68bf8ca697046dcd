mod config;
mod context;
mod event;
mod features;
mod handler;
mod outbound;
mod platform;
mod registry;
mod router;
mod store;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::context::ContextBuilder;
use crate::event::Command;
use crate::features::lang::{LanguageCallback, LanguageCommand};
use crate::features::start::StartCommand;
use crate::handler::Handler;
use crate::outbound::{Messenger, TelegramMessenger};
use crate::registry::HandlerRegistry;
use crate::router::{Router, RouterSettings};
use crate::store::{ChatStore, SqliteChatStore};

fn build_registry(messenger: Arc<dyn Messenger>, store: Arc<dyn ChatStore>) -> HandlerRegistry {
    HandlerRegistry::builder()
        .register(Handler::command(
            "start",
            Command::Start,
            Arc::new(StartCommand::new(messenger.clone())),
        ))
        .register(Handler::command(
            "lang",
            Command::Lang,
            Arc::new(LanguageCommand::new(messenger.clone())),
        ))
        .register(Handler::callback(
            "lang-choice",
            Arc::new(LanguageCallback::new(messenger, store)),
        ))
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatrouter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Bot: @{}", config.telegram.bot_username);
    info!("  Database: {}", config.memory.database_path.display());
    info!(
        "  Idle queue timeout: {:?}",
        config.dispatcher.idle_timeout()
    );

    let store: Arc<dyn ChatStore> = Arc::new(SqliteChatStore::open(&config.memory.database_path)?);

    let bot = Bot::new(&config.telegram.bot_token);
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));

    let registry = build_registry(messenger, Arc::clone(&store));
    let contexts = ContextBuilder::new(Arc::new(config.telegram.clone()), Some(store));
    let router = Router::new(
        registry,
        contexts,
        RouterSettings::from(&config.dispatcher),
        config.telegram.bot_username.clone(),
    );

    info!("Bot is starting...");
    platform::telegram::run(bot, router).await?;

    Ok(())
}
