//! Query Surface
//!
//! Cache-aside 读取：先读缓存，未命中则读数据库并回填 (固定 TTL)。
//! 用户只缓存 [`UserProfile`]，密码哈希永远不会进入缓存。
//!
//! 另外负责活动的上架 / 下架，并维护相关缓存的失效。

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    Campaign, CampaignCreate, Product, SeckillOrder, UserProfile, is_invalid_window,
};
use shared::request::validation_summary;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use super::{CacheTtls, SeckillError, SeckillResult, StockPreloader, Timeouts, bounded};
use crate::cache::{CounterCache, keys};
use crate::db::{CatalogStore, OrderStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct QueryService {
    cache: Arc<dyn CounterCache>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    preloader: StockPreloader,
    timeouts: Timeouts,
    ttls: CacheTtls,
}

impl QueryService {
    pub fn new(
        cache: Arc<dyn CounterCache>,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        preloader: StockPreloader,
        timeouts: Timeouts,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            cache,
            catalog,
            orders,
            preloader,
            timeouts,
            ttls,
        }
    }

    pub fn preloader(&self) -> &StockPreloader {
        &self.preloader
    }

    pub fn order_store(&self) -> Arc<dyn OrderStore> {
        Arc::clone(&self.orders)
    }

    /// Read `key` from the cache, falling back to `load` and repopulating
    async fn cached<T, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> SeckillResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<Option<T>>>,
    {
        let hit = bounded(self.timeouts.cache_op, "cache read", self.cache.get(key)).await?;
        if let Some(raw) = hit {
            match serde_json::from_str(&raw) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => tracing::warn!(key, error = %e, "Corrupt cache entry, reloading"),
            }
        }

        let loaded = bounded(self.timeouts.store, "store read", load()).await?;
        if let Some(value) = &loaded {
            let raw = serde_json::to_string(value)?;
            // A failed fill only costs the next reader a store hit
            if let Err(e) = bounded(
                self.timeouts.cache_op,
                "cache fill",
                self.cache.set(key, raw, Some(ttl)),
            )
            .await
            {
                tracing::warn!(key, error = %e, "Failed to populate cache");
            }
        }
        Ok(loaded)
    }

    async fn invalidate(&self, key: &str) -> SeckillResult<()> {
        bounded(self.timeouts.cache_op, "cache invalidate", self.cache.delete(key)).await?;
        Ok(())
    }

    pub async fn get_campaign(&self, campaign_id: i64) -> SeckillResult<Option<Campaign>> {
        let catalog = Arc::clone(&self.catalog);
        self.cached(&keys::campaign(campaign_id), self.ttls.campaign, || async move {
            catalog.find_campaign(campaign_id).await
        })
        .await
    }

    /// Active campaigns that have not ended, including upcoming ones
    pub async fn list_campaigns(&self) -> SeckillResult<Vec<Campaign>> {
        let catalog = Arc::clone(&self.catalog);
        let campaigns = self
            .cached(keys::CAMPAIGN_LIST, self.ttls.campaign_list, || async move {
                let now = Utc::now();
                let live: Vec<Campaign> = catalog
                    .list_campaigns()
                    .await?
                    .into_iter()
                    .filter(|c| c.is_active() && !c.has_ended_at(now))
                    .collect();
                Ok::<_, StoreError>(Some(live))
            })
            .await?
            .unwrap_or_default();

        // The cached list may outlive some of its campaigns
        let now = Utc::now();
        Ok(campaigns
            .into_iter()
            .filter(|c| !c.has_ended_at(now))
            .collect())
    }

    pub async fn get_product(&self, product_id: i64) -> SeckillResult<Option<Product>> {
        let catalog = Arc::clone(&self.catalog);
        self.cached(&keys::product(product_id), self.ttls.entity, || async move {
            catalog.find_product(product_id).await
        })
        .await
    }

    pub async fn get_user(&self, user_id: i64) -> SeckillResult<Option<UserProfile>> {
        let catalog = Arc::clone(&self.catalog);
        self.cached(&keys::user_profile(user_id), self.ttls.entity, || async move {
            let user = catalog.find_user(user_id).await?;
            Ok::<_, StoreError>(user.as_ref().map(UserProfile::from))
        })
        .await
    }

    pub async fn get_order_by_no(&self, order_no: &str) -> SeckillResult<Option<SeckillOrder>> {
        let orders = Arc::clone(&self.orders);
        let no = order_no.to_string();
        self.cached(&keys::order(order_no), self.ttls.entity, || async move {
            orders.find_order_by_no(&no).await
        })
        .await
    }

    pub async fn list_user_orders(&self, user_id: i64) -> SeckillResult<Vec<SeckillOrder>> {
        bounded(
            self.timeouts.store,
            "list orders",
            self.orders.list_orders_by_user(user_id),
        )
        .await
    }

    /// Whether the purchase mark for `(user, campaign)` is present
    pub async fn has_purchased(&self, user_id: i64, campaign_id: i64) -> SeckillResult<bool> {
        bounded(
            self.timeouts.cache_op,
            "check purchase mark",
            self.cache.exists(&keys::purchase_mark(user_id, campaign_id)),
        )
        .await
    }

    /// Create a campaign and preload its stock
    pub async fn add_campaign(&self, create: CampaignCreate) -> SeckillResult<Campaign> {
        create.validate().map_err(|e| {
            if is_invalid_window(&e) {
                SeckillError::InvalidWindow
            } else {
                SeckillError::Validation(validation_summary(&e))
            }
        })?;

        if self.get_product(create.product_id).await?.is_none() {
            return Err(SeckillError::ProductNotFound(create.product_id));
        }

        let campaign = bounded(
            self.timeouts.store,
            "insert campaign",
            self.catalog.insert_campaign(create),
        )
        .await?;
        tracing::info!(
            campaign_id = campaign.id,
            product_id = campaign.product_id,
            stock = campaign.stock_count,
            "Campaign created"
        );

        self.invalidate(keys::CAMPAIGN_LIST).await?;
        self.preloader.preload(campaign.id).await?;
        Ok(campaign)
    }

    /// Close a campaign and drop its cached state, including the stock counter
    pub async fn close_campaign(&self, campaign_id: i64) -> SeckillResult<Campaign> {
        let campaign = bounded(
            self.timeouts.store,
            "close campaign",
            self.catalog.close_campaign(campaign_id),
        )
        .await?
        .ok_or(SeckillError::CampaignNotFound(campaign_id))?;

        self.invalidate(&keys::campaign(campaign_id)).await?;
        self.invalidate(keys::CAMPAIGN_LIST).await?;
        self.invalidate(&keys::stock(campaign_id)).await?;

        tracing::info!(campaign_id, "Campaign closed");
        Ok(campaign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seckill::testing::Fixture;
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;
    use shared::models::{CampaignStatus, NewOrder, UserCreate};

    fn create(product_id: i64, stock: u32) -> CampaignCreate {
        let now = Utc::now();
        CampaignCreate {
            product_id,
            seckill_price: Decimal::new(100, 0),
            stock_count: stock,
            start_time: now - ChronoDuration::minutes(1),
            end_time: now + ChronoDuration::minutes(30),
        }
    }

    #[tokio::test]
    async fn test_campaign_read_populates_cache() {
        let fx = Fixture::new();
        let campaign = fx.live_campaign(3).await;
        let key = keys::campaign(campaign.id);
        assert!(!fx.cache.exists(&key).await.unwrap());

        let read = fx.query.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(read, campaign);
        assert!(fx.cache.exists(&key).await.unwrap());
        let ttl = fx.cache.ttl(&key).await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(30 * 60));

        // Served from cache even after the row changes
        fx.store.close_campaign(campaign.id).await.unwrap();
        let cached = fx.query.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(cached.status, CampaignStatus::Active);

        assert!(fx.query.get_campaign(999).await.unwrap().is_none());
        assert!(!fx.cache.exists(&keys::campaign(999)).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_reloaded() {
        let fx = Fixture::new();
        let campaign = fx.live_campaign(3).await;
        fx.cache
            .set(&keys::campaign(campaign.id), "not json".into(), None)
            .await
            .unwrap();

        let read = fx.query.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(read.id, campaign.id);
    }

    #[tokio::test]
    async fn test_user_cache_holds_profile_only() {
        let fx = Fixture::new();
        let user = fx
            .store
            .insert_user(UserCreate {
                username: "bob".into(),
                password_hash: "secret-hash".into(),
            })
            .await
            .unwrap();

        let profile = fx.query.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(profile.username, "bob");

        let raw = fx
            .cache
            .get(&keys::user_profile(user.id))
            .await
            .unwrap()
            .unwrap();
        assert!(!raw.contains("secret-hash"));
        assert!(!raw.contains("password"));
        assert!(fx.query.get_user(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_campaigns_filters_closed_and_ended() {
        let fx = Fixture::new();
        let now = Utc::now();
        let live = fx.live_campaign(3).await;
        let upcoming = fx
            .campaign_between(
                3,
                now + ChronoDuration::hours(1),
                now + ChronoDuration::hours(2),
            )
            .await;
        fx.campaign_between(
            3,
            now - ChronoDuration::hours(2),
            now - ChronoDuration::hours(1),
        )
        .await;
        let closed = fx.live_campaign(3).await;
        fx.store.close_campaign(closed.id).await.unwrap();

        let ids: Vec<i64> = fx
            .query
            .list_campaigns()
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![live.id, upcoming.id]);
        assert!(fx.cache.exists(keys::CAMPAIGN_LIST).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_campaign_preloads_and_invalidates_list() {
        let fx = Fixture::new();
        let product_id = fx.product().await;
        assert!(fx.query.list_campaigns().await.unwrap().is_empty());

        let campaign = fx.query.add_campaign(create(product_id, 7)).await.unwrap();
        assert_eq!(fx.stock(campaign.id).await, Some(7));

        let listed = fx.query.list_campaigns().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, campaign.id);
    }

    #[tokio::test]
    async fn test_add_campaign_validation() {
        let fx = Fixture::new();
        let product_id = fx.product().await;

        let mut inverted = create(product_id, 1);
        inverted.end_time = inverted.start_time - ChronoDuration::minutes(1);
        assert!(matches!(
            fx.query.add_campaign(inverted).await,
            Err(SeckillError::InvalidWindow)
        ));

        let mut negative = create(product_id, 1);
        negative.seckill_price = -negative.seckill_price;
        assert!(matches!(
            fx.query.add_campaign(negative).await,
            Err(SeckillError::Validation(_))
        ));

        assert!(matches!(
            fx.query.add_campaign(create(404, 1)).await,
            Err(SeckillError::ProductNotFound(404))
        ));
        assert!(fx.store.list_campaigns().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_campaign_drops_cached_state() {
        let fx = Fixture::new();
        let campaign = fx.live_campaign(3).await;
        fx.query.get_campaign(campaign.id).await.unwrap();
        fx.query.list_campaigns().await.unwrap();

        let closed = fx.query.close_campaign(campaign.id).await.unwrap();
        assert_eq!(closed.status, CampaignStatus::Closed);
        assert_eq!(fx.stock(campaign.id).await, None);
        assert!(fx.query.list_campaigns().await.unwrap().is_empty());
        let reread = fx.query.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(reread.status, CampaignStatus::Closed);

        assert!(matches!(
            fx.query.close_campaign(404).await,
            Err(SeckillError::CampaignNotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_order_reads() {
        let fx = Fixture::new();
        let campaign = fx.live_campaign(3).await;
        let order = fx
            .store
            .create_order(NewOrder::for_campaign(5, &campaign, Utc::now()))
            .await
            .unwrap();

        let found = fx.query.get_order_by_no(&order.order_no).await.unwrap();
        assert_eq!(found, Some(order.clone()));
        assert!(fx.cache.exists(&keys::order(&order.order_no)).await.unwrap());
        assert!(fx.query.get_order_by_no("nope").await.unwrap().is_none());

        let orders = fx.query.list_user_orders(5).await.unwrap();
        assert_eq!(orders, vec![order]);
        assert!(!fx.query.has_purchased(5, campaign.id).await.unwrap());
    }
}
