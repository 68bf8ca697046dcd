use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default = "default_memory_config")]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Static bot settings, handed to every handler through its context
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub bot_username: String,
    #[serde(default)]
    pub owner_id: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DispatcherConfig {
    /// Evict a conversation queue after this many idle seconds. Unset keeps
    /// queues for the lifetime of the process.
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

impl DispatcherConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("chatrouter.db")
}

fn default_memory_config() -> MemoryConfig {
    MemoryConfig {
        database_path: default_db_path(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [telegram]
            bot_token = "123:abc"
            bot_username = "mybot"
            "#,
        )
        .unwrap();

        assert_eq!(config.telegram.bot_username, "mybot");
        assert_eq!(config.telegram.owner_id, None);
        assert_eq!(config.memory.database_path, PathBuf::from("chatrouter.db"));
        assert_eq!(config.dispatcher.idle_timeout(), None);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [telegram]
            bot_token = "123:abc"
            bot_username = "mybot"
            owner_id = 99

            [memory]
            database_path = "/tmp/chats.db"

            [dispatcher]
            idle_timeout_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.telegram.owner_id, Some(99));
        assert_eq!(config.memory.database_path, PathBuf::from("/tmp/chats.db"));
        assert_eq!(
            config.dispatcher.idle_timeout(),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let err = Config::from_toml(
            r#"
            [telegram]
            bot_token = " "
            bot_username = "mybot"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn test_zero_idle_timeout_disables_eviction() {
        let dispatcher = DispatcherConfig {
            idle_timeout_secs: Some(0),
        };
        assert_eq!(dispatcher.idle_timeout(), None);
    }
}
