//! Purchase Orchestrator
//!
//! 秒杀下单流程：
//!
//! ```text
//! start → 幂等检查 → 活动校验 → 占位 (claim) → 扣减库存
//!       → 创建订单 → 写购买标记 → succeeded
//!       | 库存不足 → 回补 → soldOut
//!       | 订单失败 → 回补 → error
//! ```
//!
//! 超卖只由缓存计数器的原子扣减保证，不加任何全局锁。
//! 同一用户的并发请求由 `set_if_absent` 占位串行化，
//! 数据库的 `(campaign, user)` 唯一约束作为最后一道防线。

use chrono::Utc;
use shared::error::ErrorCode;
use shared::models::{Campaign, NewOrder, SeckillOrder};
use std::sync::Arc;

use super::{QueryService, SeckillError, SeckillResult, Timeouts, bounded};
use crate::cache::{CounterCache, keys};
use crate::db::{OrderStore, StoreError};

/// Terminal result of a purchase attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Succeeded(SeckillOrder),
    AlreadyPurchased,
    SoldOut,
    CampaignNotLive,
    CampaignNotFound,
}

impl PurchaseOutcome {
    pub fn is_success(&self) -> bool {
        self.code().is_success()
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PurchaseOutcome::Succeeded(_) => ErrorCode::Success,
            PurchaseOutcome::AlreadyPurchased => ErrorCode::AlreadyPurchased,
            PurchaseOutcome::SoldOut => ErrorCode::SoldOut,
            PurchaseOutcome::CampaignNotLive => ErrorCode::CampaignNotLive,
            PurchaseOutcome::CampaignNotFound => ErrorCode::CampaignNotFound,
        }
    }
}

#[derive(Clone)]
pub struct PurchaseOrchestrator {
    cache: Arc<dyn CounterCache>,
    orders: Arc<dyn OrderStore>,
    query: QueryService,
    timeouts: Timeouts,
}

impl PurchaseOrchestrator {
    pub fn new(
        cache: Arc<dyn CounterCache>,
        orders: Arc<dyn OrderStore>,
        query: QueryService,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            cache,
            orders,
            query,
            timeouts,
        }
    }

    /// Attempt one purchase of `campaign_id` by `user_id`
    ///
    /// Returns `Err` only for infrastructure failures; any reservation held
    /// at that point has already been given back.
    pub async fn purchase(&self, user_id: i64, campaign_id: i64) -> SeckillResult<PurchaseOutcome> {
        // 1. 幂等检查 (advisory)
        let mark_key = keys::purchase_mark(user_id, campaign_id);
        if self.cache_op("check purchase mark", self.cache.exists(&mark_key)).await? {
            tracing::debug!(user_id, campaign_id, "Purchase mark present");
            return Ok(PurchaseOutcome::AlreadyPurchased);
        }

        // 2. 活动校验
        let Some(campaign) = self.query.get_campaign(campaign_id).await? else {
            return Ok(PurchaseOutcome::CampaignNotFound);
        };
        let now = Utc::now();
        if !campaign.is_live_at(now) {
            return Ok(PurchaseOutcome::CampaignNotLive);
        }

        // 3. 占位：同一用户同一活动同时只有一个请求能继续
        let claim_key = keys::purchase_claim(user_id, campaign_id);
        let claimed = self
            .cache_op(
                "claim purchase",
                self.cache
                    .set_if_absent(&claim_key, now.to_rfc3339(), campaign.remaining_at(now)),
            )
            .await?;
        if !claimed {
            tracing::debug!(user_id, campaign_id, "Purchase claim already held");
            return Ok(PurchaseOutcome::AlreadyPurchased);
        }

        // 4. 原子扣减
        let stock_key = keys::stock(campaign_id);
        let left = match self
            .cache_op("reserve stock", self.cache.decrement(&stock_key))
            .await
        {
            Ok(left) => left,
            Err(e) => {
                // A timed-out decrement may still have applied; the unit is
                // then lost to the sale, never oversold.
                tracing::warn!(user_id, campaign_id, error = %e, "Stock reservation failed");
                self.release_claim(&claim_key).await;
                return Err(e);
            }
        };

        // 5. 库存不足
        if left < 0 {
            self.compensate(&stock_key, &campaign).await;
            self.release_claim(&claim_key).await;
            tracing::debug!(user_id, campaign_id, "Sold out");
            return Ok(PurchaseOutcome::SoldOut);
        }

        // 6. 创建订单 (显式事务，结果确定后才做补偿)
        let order = NewOrder::for_campaign(user_id, &campaign, now);
        match self.orders.create_order(order).await {
            Ok(order) => {
                // 7. 购买标记
                self.mark_purchased(&mark_key, &order.order_no, &campaign).await;
                tracing::info!(
                    user_id,
                    campaign_id,
                    order_no = %order.order_no,
                    stock_left = left,
                    "Seckill succeeded"
                );
                Ok(PurchaseOutcome::Succeeded(order))
            }
            Err(StoreError::DuplicateOrder { order_no, .. }) => {
                // Claim was lost (cache restart or expiry) but the order exists
                self.compensate(&stock_key, &campaign).await;
                self.mark_purchased(&mark_key, &order_no, &campaign).await;
                tracing::warn!(user_id, campaign_id, %order_no, "Duplicate order rejected by store");
                Ok(PurchaseOutcome::AlreadyPurchased)
            }
            Err(e) => {
                // 8. 订单失败，回补库存
                self.compensate(&stock_key, &campaign).await;
                self.release_claim(&claim_key).await;
                tracing::error!(user_id, campaign_id, error = %e, "Order persistence failed");
                Err(SeckillError::OrderPersist(e))
            }
        }
    }

    async fn cache_op<T, F>(&self, op: &'static str, fut: F) -> SeckillResult<T>
    where
        F: std::future::Future<Output = crate::cache::CacheResult<T>>,
    {
        bounded(self.timeouts.cache_op, op, fut).await
    }

    /// Give a reserved unit back to the counter
    ///
    /// The increment may recreate a key that was never preloaded or was
    /// dropped by a close, so the expiry is pinned to the campaign end again.
    async fn compensate(&self, stock_key: &str, campaign: &Campaign) {
        if let Err(e) = self
            .cache_op("compensate stock", self.cache.increment(stock_key))
            .await
        {
            tracing::error!(campaign_id = campaign.id, error = %e, "Stock compensation failed");
            return;
        }
        if let Err(e) = self
            .cache_op(
                "pin stock expiry",
                self.cache.expire_at(stock_key, campaign.end_time),
            )
            .await
        {
            tracing::warn!(campaign_id = campaign.id, error = %e, "Failed to pin stock expiry");
        }
    }

    async fn release_claim(&self, claim_key: &str) {
        if let Err(e) = self
            .cache_op("release claim", self.cache.delete(claim_key))
            .await
        {
            tracing::warn!(key = claim_key, error = %e, "Failed to release purchase claim");
        }
    }

    /// The claim keeps blocking repeats if this write fails
    async fn mark_purchased(&self, mark_key: &str, order_no: &str, campaign: &Campaign) {
        let Some(ttl) = campaign.remaining_at(Utc::now()) else {
            return;
        };
        if let Err(e) = self
            .cache_op(
                "set purchase mark",
                self.cache.set(mark_key, order_no.to_string(), Some(ttl)),
            )
            .await
        {
            tracing::warn!(order_no, error = %e, "Failed to set purchase mark");
        }
    }
}
