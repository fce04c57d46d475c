//! Fast Counter Cache
//!
//! 秒杀的库存计数器与购买标记都存放在这里。核心正确性只依赖一个前提：
//! 同一个 key 上的 `increment` / `decrement` / `set_if_absent` 对所有并发调用者
//! 都是线性一致 (linearizable) 的原子操作。
//!
//! # 模块结构
//!
//! - [`CounterCache`] - 缓存契约 (可替换为远程缓存实现)
//! - [`MemoryCache`] - 基于 DashMap 的进程内实现
//! - [`keys`] - key 布局

pub mod keys;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryCache;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("value at key '{0}' is not an integer")]
    NotAnInteger(String),

    #[error("increment or decrement would overflow at key '{0}'")]
    Overflow(String),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value cache with atomic counters and per-key expiry
///
/// Semantics follow Redis string commands:
/// - a missing or expired key reads as absent
/// - `increment` / `decrement` treat a missing key as `0` and keep any
///   existing expiry of the key
/// - `expire_at` with an instant in the past removes the key
#[async_trait]
pub trait CounterCache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write `value`, replacing any prior value and expiry
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    /// Write `value` only if the key is absent; returns whether it was written
    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> CacheResult<bool>;

    /// Atomic `value - 1`, returns the new value
    async fn decrement(&self, key: &str) -> CacheResult<i64>;

    /// Atomic `value + 1`, returns the new value
    async fn increment(&self, key: &str) -> CacheResult<i64>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Set an absolute deadline; returns `false` if the key does not exist
    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> CacheResult<bool>;

    /// Returns whether a key was removed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remaining time to live; `None` if the key is absent or has no expiry
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;
}
