use crate::config::types::HostConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    config: HostConfig,
    stored_at: Instant,
}

/// Hostname keyed cache of resolved [`HostConfig`]s.
///
/// Valid entries live for the whole process. Invalid entries (the negative cache) live forever
/// as well unless a negative TTL is configured, in which case a stale one reads as absent so the
/// host gets resolved again.
#[derive(Debug, Default)]
pub struct HostCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    negative_ttl: Option<Duration>,
}

impl HostCache {
    pub fn new(negative_ttl: Option<Duration>) -> Self {
        Self { entries: RwLock::new(HashMap::new()), negative_ttl }
    }

    pub async fn get(&self, hostname: &str) -> Option<HostConfig> {
        let entries = self.entries.read().await;
        entries.get(hostname).filter(|entry| self.is_fresh(entry)).map(|entry| entry.config)
    }

    /// Store `config` unless a fresh entry already exists, and return whichever is stored.
    ///
    /// Two requests racing on the same unseen hostname both parse its document; the first one
    /// to get here wins and the loser adopts its result.
    pub async fn insert(&self, hostname: String, config: HostConfig) -> HostConfig {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&hostname).filter(|entry| self.is_fresh(entry)) {
            return existing.config;
        }
        if self.negative_ttl.is_some() {
            // Expired negative entries are dropped on write so unique unknown hosts cannot pile up
            entries.retain(|_, entry| self.is_fresh(entry));
        }
        entries.insert(hostname, CacheEntry { config, stored_at: Instant::now() });
        config
    }

    pub async fn evict(&self, hostname: &str) -> bool {
        self.entries.write().await.remove(hostname).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        if entry.config.is_valid() {
            return true;
        }
        match self.negative_ttl {
            Some(ttl) => entry.stored_at.elapsed() < ttl,
            None => true,
        }
    }
}
