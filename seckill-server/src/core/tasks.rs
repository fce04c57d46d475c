//! 后台任务
//!
//! 目前只有缓存过期清理：读写路径上过期 key 已惰性失效，
//! 这里定期把它们真正从内存中移除。

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cache::MemoryCache;

/// Spawn the periodic expired-key sweeper
pub fn spawn_cache_sweeper(cache: Arc<MemoryCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, remaining = cache.len(), "Expired cache entries swept");
            }
        }
    })
}
