//! Seckill Order Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Campaign;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Created,
    Paid,
    Cancelled,
}

/// Seckill order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeckillOrder {
    pub id: i64,
    /// Globally unique order number (128-bit random, hex)
    pub order_no: String,
    pub user_id: i64,
    pub product_id: i64,
    pub seckill_id: i64,
    pub seckill_price: Decimal,
    pub status: OrderStatus,
    pub create_time: DateTime<Utc>,
    pub pay_time: Option<DateTime<Utc>>,
}

/// Order row to persist; the store assigns `id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub order_no: String,
    pub user_id: i64,
    pub product_id: i64,
    pub seckill_id: i64,
    pub seckill_price: Decimal,
    pub create_time: DateTime<Utc>,
}

impl NewOrder {
    /// Build an order for `user_id` capturing price and product from the campaign read
    pub fn for_campaign(user_id: i64, campaign: &Campaign, now: DateTime<Utc>) -> Self {
        Self {
            order_no: generate_order_no(),
            user_id,
            product_id: campaign.product_id,
            seckill_id: campaign.id,
            seckill_price: campaign.seckill_price,
            create_time: now,
        }
    }

    pub fn into_order(self, id: i64) -> SeckillOrder {
        SeckillOrder {
            id,
            order_no: self.order_no,
            user_id: self.user_id,
            product_id: self.product_id,
            seckill_id: self.seckill_id,
            seckill_price: self.seckill_price,
            status: OrderStatus::Created,
            create_time: self.create_time,
            pay_time: None,
        }
    }
}

/// Random v4 UUID in simple (32 hex chars) form
pub fn generate_order_no() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CampaignStatus;
    use std::collections::HashSet;

    #[test]
    fn test_order_no_is_unique_hex() {
        let nos: HashSet<String> = (0..1000).map(|_| generate_order_no()).collect();
        assert_eq!(nos.len(), 1000);
        assert!(nos.iter().all(|n| n.len() == 32 && n.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn test_new_order_captures_campaign_fields() {
        let now = Utc::now();
        let campaign = Campaign {
            id: 7,
            product_id: 42,
            seckill_price: Decimal::new(1990, 2),
            stock_count: 3,
            start_time: now,
            end_time: now + chrono::Duration::hours(1),
            status: CampaignStatus::Active,
            create_time: now,
        };

        let order = NewOrder::for_campaign(9, &campaign, now).into_order(1);
        assert_eq!(order.seckill_id, 7);
        assert_eq!(order.product_id, 42);
        assert_eq!(order.user_id, 9);
        assert_eq!(order.seckill_price, Decimal::new(1990, 2));
        assert_eq!(order.status, OrderStatus::Created);
        assert!(order.pay_time.is_none());
    }
}
