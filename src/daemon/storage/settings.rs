use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::{Serialize, de::DeserializeOwned};

use super::event_store::EventStore;

const BLACKLIST_KEY: &str = "blacklist";
const RECENT_SEARCHES_KEY: &str = "recent_searches";

pub const MAX_RECENT_SEARCHES: usize = 10;

fn read_value<T: DeserializeOwned + Default>(conn: &Connection, key: &str) -> Result<T> {
    let stored: Option<String> = conn
        .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("failed to read config value {key}"))?;
    match stored {
        Some(json) => serde_json::from_str(&json)
            .with_context(|| format!("config value {key} is not valid json")),
        None => Ok(T::default()),
    }
}

fn write_value<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    conn.execute(
        "INSERT INTO config (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, serde_json::to_string(value)?],
    )
    .with_context(|| format!("failed to write config value {key}"))?;
    Ok(())
}

/// Trims keywords, drops empty ones and removes case-insensitive duplicates while keeping
/// the first spelling.
pub fn normalize_keywords<K: AsRef<str>>(keywords: impl IntoIterator<Item = K>) -> Vec<String> {
    let mut normalized: Vec<String> = vec![];
    for keyword in keywords {
        let keyword = keyword.as_ref().trim();
        if keyword.is_empty() {
            continue;
        }
        let folded = keyword.to_lowercase();
        if normalized.iter().any(|v| v.to_lowercase() == folded) {
            continue;
        }
        normalized.push(keyword.to_string());
    }
    normalized
}

/// Moves `query` to the front of `recent`, keeping at most [MAX_RECENT_SEARCHES] entries.
pub fn push_recent(recent: &mut Vec<String>, query: &str) {
    recent.retain(|v| v != query);
    recent.insert(0, query.to_string());
    recent.truncate(MAX_RECENT_SEARCHES);
}

impl EventStore {
    pub fn blacklist(&self) -> Result<Vec<String>> {
        read_value(self.connection(), BLACKLIST_KEY)
    }

    /// Replaces the whole keyword set. Returns the keywords as they were stored.
    pub fn set_blacklist<K: AsRef<str>>(
        &mut self,
        keywords: impl IntoIterator<Item = K>,
    ) -> Result<Vec<String>> {
        let keywords = normalize_keywords(keywords);
        write_value(self.connection(), BLACKLIST_KEY, &keywords)?;
        Ok(keywords)
    }

    /// Most recent first.
    pub fn recent_searches(&self) -> Result<Vec<String>> {
        read_value(self.connection(), RECENT_SEARCHES_KEY)
    }

    /// Remembers a submitted query. Blank queries are ignored.
    pub fn record_search(&mut self, query: &str) -> Result<()> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        let tx = self
            .connection_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin recent search transaction")?;
        let mut recent: Vec<String> = read_value(&tx, RECENT_SEARCHES_KEY)?;
        push_recent(&mut recent, query);
        write_value(&tx, RECENT_SEARCHES_KEY, &recent)?;
        tx.commit().context("failed to commit recent searches")?;
        Ok(())
    }
}
