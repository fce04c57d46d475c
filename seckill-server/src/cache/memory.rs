//! In-process cache backed by DashMap
//!
//! 每个 key 的读改写都在 DashMap 分片写锁内完成 (entry API)，
//! 因此同一 key 上的 increment / decrement / set_if_absent 是线性一致的。
//! 过期 key 惰性失效，并由后台任务定期清理 ([`MemoryCache::sweep_expired`])。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;

use super::{CacheError, CacheResult, CounterCache};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new(value: String, now: DateTime<Utc>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| deadline(now, ttl)),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn deadline(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// DashMap-backed [`CounterCache`]
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry, returns how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn add(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let now = Utc::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(CacheEntry::new(delta.to_string(), now, None));
                    return Ok(delta);
                }
                let current: i64 = occupied
                    .get()
                    .value
                    .parse()
                    .map_err(|_| CacheError::NotAnInteger(key.to_string()))?;
                let next = current
                    .checked_add(delta)
                    .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
                occupied.get_mut().value = next.to_string();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(delta.to_string(), now, None));
                Ok(delta)
            }
        }
    }
}

#[async_trait]
impl CounterCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Utc::now();
        let value = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        // Expired: drop lazily (guard released above)
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Utc::now();
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, now, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        let now = Utc::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    return Ok(false);
                }
                occupied.insert(CacheEntry::new(value, now, ttl));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, now, ttl));
                Ok(true)
            }
        }
    }

    async fn decrement(&self, key: &str) -> CacheResult<i64> {
        self.add(key, -1)
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        self.add(key, 1)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> CacheResult<bool> {
        let now = Utc::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.remove();
                    return Ok(false);
                }
                if at <= now {
                    occupied.remove();
                } else {
                    occupied.get_mut().expires_at = Some(at);
                }
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Utc::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let now = Utc::now();
        Ok(self.entries.get(key).and_then(|entry| {
            if entry.is_expired(now) {
                return None;
            }
            entry.expires_at.and_then(|at| (at - now).to_std().ok())
        }))
    }
}
