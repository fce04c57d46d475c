//! 秒杀核心
//!
//! - [`StockPreloader`] - 库存预热 (store → cache)
//! - [`PurchaseOrchestrator`] - 秒杀下单流程
//! - [`QueryService`] - cache-aside 查询与活动管理
//!
//! 所有依赖都在构造时显式传入 (`Arc<dyn CounterCache>` / `Arc<dyn ...Store>`)，
//! 测试中可替换为 fake 实现。

pub mod error;
pub mod orchestrator;
pub mod preloader;
pub mod query;

use std::future::Future;
use std::time::Duration;

pub use error::{SeckillError, SeckillResult};
pub use orchestrator::{PurchaseOrchestrator, PurchaseOutcome};
pub use preloader::{PreloadOutcome, StockPreloader};
pub use query::QueryService;

/// Upper bounds for a single cache operation / store read
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub cache_op: Duration,
    pub store: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            cache_op: Duration::from_millis(500),
            store: Duration::from_millis(3000),
        }
    }
}

/// Cache-aside entry lifetimes
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub campaign: Duration,
    pub campaign_list: Duration,
    pub entity: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            campaign: Duration::from_secs(30 * 60),
            campaign_list: Duration::from_secs(5 * 60),
            entity: Duration::from_secs(30 * 60),
        }
    }
}

/// Await `fut` for at most `limit`; elapsing maps to [`SeckillError::Timeout`]
pub(crate) async fn bounded<T, E, F>(limit: Duration, op: &'static str, fut: F) -> SeckillResult<T>
where
    F: Future<Output = Result<T, E>>,
    SeckillError: From<E>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(SeckillError::from),
        Err(_) => Err(SeckillError::Timeout(op)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the seckill unit tests

    use super::*;
    use crate::cache::{CounterCache, MemoryCache};
    use crate::db::{CatalogStore, OrderStore, RedbStore};
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use shared::models::{Campaign, CampaignCreate, ProductCreate};
    use std::sync::Arc;

    pub struct Fixture {
        pub cache: Arc<MemoryCache>,
        pub store: Arc<RedbStore>,
        pub query: QueryService,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_order_store(None)
        }

        /// Use `orders` instead of the redb store for order writes
        pub fn with_order_store(orders: Option<Arc<dyn OrderStore>>) -> Self {
            let cache = Arc::new(MemoryCache::new());
            let store = Arc::new(RedbStore::open_in_memory(Duration::from_secs(3)).unwrap());
            let orders = orders.unwrap_or_else(|| store.clone() as Arc<dyn OrderStore>);
            let preloader = StockPreloader::new(
                cache.clone() as Arc<dyn CounterCache>,
                store.clone() as Arc<dyn CatalogStore>,
                Timeouts::default(),
            );
            let query = QueryService::new(
                cache.clone(),
                store.clone(),
                orders,
                preloader,
                Timeouts::default(),
                CacheTtls::default(),
            );
            Self {
                cache,
                store,
                query,
            }
        }

        pub fn orchestrator(&self) -> PurchaseOrchestrator {
            PurchaseOrchestrator::new(
                self.cache.clone(),
                self.query.order_store(),
                self.query.clone(),
                Timeouts::default(),
            )
        }

        pub async fn product(&self) -> i64 {
            self.store
                .insert_product(ProductCreate {
                    product_name: "iPhone".into(),
                    product_desc: String::new(),
                    price: Decimal::new(599900, 2),
                    stock_count: 100,
                })
                .await
                .unwrap()
                .id
        }

        /// Insert a campaign directly into the store (not preloaded)
        pub async fn campaign_between(
            &self,
            stock: u32,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Campaign {
            let product_id = self.product().await;
            self.store
                .insert_campaign(CampaignCreate {
                    product_id,
                    seckill_price: Decimal::new(99900, 2),
                    stock_count: stock,
                    start_time: start,
                    end_time: end,
                })
                .await
                .unwrap()
        }

        /// Live campaign (started a minute ago, one hour left), preloaded
        pub async fn live_campaign(&self, stock: u32) -> Campaign {
            let now = Utc::now();
            let campaign = self
                .campaign_between(
                    stock,
                    now - chrono::Duration::minutes(1),
                    now + chrono::Duration::hours(1),
                )
                .await;
            self.query.preloader().preload(campaign.id).await.unwrap();
            campaign
        }

        pub async fn stock(&self, campaign_id: i64) -> Option<i64> {
            self.cache
                .get(&crate::cache::keys::stock(campaign_id))
                .await
                .unwrap()
                .map(|v| v.parse().unwrap())
        }
    }
}
