//! TTL-memoized snapshot of the knowledge sheet.
//!
//! One process-wide entry with a fixed expiry. The refresh action (and every
//! successful append) invalidates it so new records show up immediately.

use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::sheets::{self, SheetSnapshot};

pub struct SheetCache {
    ttl: Duration,
    inner: RwLock<Option<Entry>>,
}

struct Entry {
    loaded_at: Instant,
    snapshot: SheetSnapshot,
}

impl SheetCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            inner: RwLock::new(None),
        }
    }

    /// Return the memoized snapshot, re-reading the sheet when the entry is
    /// missing or older than the TTL.
    pub async fn get_or_load(&self, config: &Config) -> Result<SheetSnapshot> {
        if let Some(snapshot) = self.cached().await {
            return Ok(snapshot);
        }

        let snapshot = sheets::read_all(config).await?;
        self.put(snapshot.clone()).await;
        Ok(snapshot)
    }

    /// The snapshot, if present and younger than the TTL.
    pub async fn cached(&self) -> Option<SheetSnapshot> {
        let guard = self.inner.read().await;
        match guard.as_ref() {
            Some(entry) if entry.loaded_at.elapsed() < self.ttl => Some(entry.snapshot.clone()),
            _ => None,
        }
    }

    pub async fn put(&self, snapshot: SheetSnapshot) {
        let mut guard = self.inner.write().await;
        *guard = Some(Entry {
            loaded_at: Instant::now(),
            snapshot,
        });
    }

    /// Drop the snapshot so the next read goes back to the sheet.
    pub async fn invalidate(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SheetSnapshot {
        SheetSnapshot {
            header: vec!["id".to_string(), "title".to_string()],
            rows: vec![vec!["r1".to_string(), "Inflation watch".to_string()]],
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_is_returned() {
        let cache = SheetCache::new(600);
        cache.put(snapshot()).await;
        let cached = cache.cached().await.unwrap();
        assert_eq!(cached.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_ignored() {
        let cache = SheetCache::new(0);
        cache.put(snapshot()).await;
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_entry() {
        let cache = SheetCache::new(600);
        cache.put(snapshot()).await;
        cache.invalidate().await;
        assert!(cache.cached().await.is_none());
    }
}
