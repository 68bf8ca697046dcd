use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::event::ConversationKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    #[default]
    English,
    Ukrainian,
    Russian,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Ukrainian, Language::Russian];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "ENGLISH",
            Language::Ukrainian => "UKRAINIAN",
            Language::Russian => "RUSSIAN",
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .with_context(|| format!("Unknown language: {}", s))
    }
}

/// Stored preferences of one chat
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatState {
    pub language: Language,
}

/// Conversation-scoped state lookup used while building handler contexts
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn get(&self, key: ConversationKey) -> Result<Option<ChatState>>;
    async fn upsert(&self, key: ConversationKey, state: &ChatState) -> Result<()>;
}

/// SQLite-backed chat preferences
#[derive(Clone)]
pub struct SqliteChatStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChatStore {
    /// Open or create the SQLite database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Chat store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS telegram_chat (
                id INTEGER PRIMARY KEY,
                language TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )
        .context("Failed to run chat store migrations")?;
        Ok(())
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn get(&self, key: ConversationKey) -> Result<Option<ChatState>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT language FROM telegram_chat WHERE id = ?1")
            .context("Failed to prepare chat query")?;
        let mut rows = stmt
            .query_map(rusqlite::params![key.0], |row| row.get::<_, String>(0))
            .context("Failed to query chat")?;

        match rows.next() {
            Some(Ok(language)) => Ok(Some(ChatState {
                language: language.parse()?,
            })),
            Some(Err(e)) => Err(e).context("Failed to read chat row"),
            None => Ok(None),
        }
    }

    async fn upsert(&self, key: ConversationKey, state: &ChatState) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO telegram_chat (id, language, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                language = excluded.language,
                updated_at = excluded.updated_at",
            rusqlite::params![key.0, state.language.as_str(), now],
        )
        .with_context(|| format!("Failed to save chat {}", key))?;
        Ok(())
    }
}
