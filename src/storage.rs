use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

/// Cache storage seam. Payloads are JSON strings; expiry is epoch seconds
/// and is checked at read time only (no background eviction).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a payload if present and not expired at `now`.
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
    /// Remove entries whose key starts with `prefix` (all entries when
    /// `None`). Returns the number removed.
    async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64>;
    /// (total entries, entries already expired at `now`)
    async fn cache_counts(&self, now: i64) -> Result<(u64, u64)>;
}

/// In-memory backend for tests and short-lived embedders. Single-process
/// only; the sqlite-backed `db::Database` is the persistent choice.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, i64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(payload, _)| payload.clone()))
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (payload.to_string(), expires_at));
        Ok(())
    }

    async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        match prefix {
            Some(p) => entries.retain(|k, _| !k.starts_with(p)),
            None => entries.clear(),
        }
        Ok((before - entries.len()) as u64)
    }

    async fn cache_counts(&self, now: i64) -> Result<(u64, u64)> {
        let entries = self.entries.lock().unwrap();
        let total = entries.len() as u64;
        let expired = entries.values().filter(|(_, exp)| *exp <= now).count() as u64;
        Ok((total, expired))
    }
}
