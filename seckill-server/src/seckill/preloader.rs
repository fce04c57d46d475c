//! Stock Preloader
//!
//! 将活动库存从数据库写入缓存计数器 `seckill:stock:{id}`，
//! TTL 与活动结束时间对齐。重复预热是覆盖写 (last write wins)。

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::{SeckillError, SeckillResult, Timeouts, bounded};
use crate::cache::{CounterCache, keys};
use crate::db::CatalogStore;

/// Result of a preload call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// Counter set to `stock`, expiring with the campaign
    Loaded { stock: u32, ttl: Duration },
    /// Campaign already ended; counter removed instead
    Ended,
}

#[derive(Clone)]
pub struct StockPreloader {
    cache: Arc<dyn CounterCache>,
    catalog: Arc<dyn CatalogStore>,
    timeouts: Timeouts,
}

impl StockPreloader {
    pub fn new(
        cache: Arc<dyn CounterCache>,
        catalog: Arc<dyn CatalogStore>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            cache,
            catalog,
            timeouts,
        }
    }

    /// Seed the remaining-stock counter of `campaign_id` from the store
    ///
    /// The campaign must exist and be active. Any existing counter is
    /// overwritten, including one already decremented by purchases.
    pub async fn preload(&self, campaign_id: i64) -> SeckillResult<PreloadOutcome> {
        let campaign = bounded(
            self.timeouts.store,
            "load campaign",
            self.catalog.find_campaign(campaign_id),
        )
        .await?
        .ok_or(SeckillError::CampaignNotFound(campaign_id))?;

        if !campaign.is_active() {
            return Err(SeckillError::CampaignNotLive(campaign_id));
        }

        let key = keys::stock(campaign_id);
        let Some(ttl) = campaign.remaining_at(Utc::now()) else {
            bounded(self.timeouts.cache_op, "drop stock", self.cache.delete(&key)).await?;
            tracing::warn!(campaign_id, "Campaign already ended, stock not preloaded");
            return Ok(PreloadOutcome::Ended);
        };

        bounded(
            self.timeouts.cache_op,
            "preload stock",
            self.cache
                .set(&key, campaign.stock_count.to_string(), Some(ttl)),
        )
        .await?;

        tracing::info!(
            campaign_id,
            stock = campaign.stock_count,
            ttl_secs = ttl.as_secs(),
            "Stock preloaded"
        );
        Ok(PreloadOutcome::Loaded {
            stock: campaign.stock_count,
            ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seckill::testing::Fixture;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_preload_sets_counter_with_campaign_ttl() {
        let fx = Fixture::new();
        let now = Utc::now();
        let campaign = fx
            .campaign_between(10, now, now + ChronoDuration::minutes(10))
            .await;

        let outcome = fx.query.preloader().preload(campaign.id).await.unwrap();
        let PreloadOutcome::Loaded { stock, ttl } = outcome else {
            panic!("expected loaded, got {outcome:?}");
        };
        assert_eq!(stock, 10);
        assert!(ttl <= Duration::from_secs(600));

        assert_eq!(fx.stock(campaign.id).await, Some(10));
        let cache_ttl = fx.cache.ttl(&keys::stock(campaign.id)).await.unwrap().unwrap();
        assert!(cache_ttl <= Duration::from_secs(600));
        assert!(cache_ttl > Duration::from_secs(590));
    }

    #[tokio::test]
    async fn test_preload_is_idempotent_reset() {
        let fx = Fixture::new();
        let campaign = fx.live_campaign(5).await;

        fx.cache.decrement(&keys::stock(campaign.id)).await.unwrap();
        fx.cache.decrement(&keys::stock(campaign.id)).await.unwrap();
        assert_eq!(fx.stock(campaign.id).await, Some(3));

        fx.query.preloader().preload(campaign.id).await.unwrap();
        fx.query.preloader().preload(campaign.id).await.unwrap();
        assert_eq!(fx.stock(campaign.id).await, Some(5));
    }

    #[tokio::test]
    async fn test_preload_not_started_campaign() {
        let fx = Fixture::new();
        let now = Utc::now();
        let campaign = fx
            .campaign_between(
                3,
                now + ChronoDuration::hours(1),
                now + ChronoDuration::hours(2),
            )
            .await;

        fx.query.preloader().preload(campaign.id).await.unwrap();
        assert_eq!(fx.stock(campaign.id).await, Some(3));
    }

    #[tokio::test]
    async fn test_preload_ended_campaign_is_noop() {
        let fx = Fixture::new();
        let now = Utc::now();
        let campaign = fx
            .campaign_between(
                3,
                now - ChronoDuration::hours(2),
                now - ChronoDuration::hours(1),
            )
            .await;
        fx.cache
            .set(&keys::stock(campaign.id), "1".into(), None)
            .await
            .unwrap();

        let outcome = fx.query.preloader().preload(campaign.id).await.unwrap();
        assert_eq!(outcome, PreloadOutcome::Ended);
        assert_eq!(fx.stock(campaign.id).await, None);
    }

    #[tokio::test]
    async fn test_preload_rejects_missing_and_closed() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.query.preloader().preload(404).await,
            Err(SeckillError::CampaignNotFound(404))
        ));

        let campaign = fx.live_campaign(3).await;
        fx.store.close_campaign(campaign.id).await.unwrap();
        assert!(matches!(
            fx.query.preloader().preload(campaign.id).await,
            Err(SeckillError::CampaignNotLive(_))
        ));
    }
}
