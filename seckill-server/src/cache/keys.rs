//! Cache key layout
//!
//! | Key | Value | TTL |
//! |-----|-------|-----|
//! | `seckill:stock:{campaignId}` | remaining stock (integer) | campaign end |
//! | `user:{userId}:seckill:{campaignId}` | purchase mark (order no) | campaign end |
//! | `seckill:claim:{campaignId}:{userId}` | purchase claim | campaign end |
//! | `seckill:product:{campaignId}` | campaign JSON | fixed |
//! | `seckill:products:all` | live campaign list JSON | fixed |
//! | `product:{productId}` | product JSON | fixed |
//! | `user:profile:{userId}` | user profile JSON | fixed |
//! | `seckill:order:{orderNo}` | order JSON | fixed |
//!
//! The first two are part of the external interface and must not change.

pub const CAMPAIGN_LIST: &str = "seckill:products:all";

pub fn stock(campaign_id: i64) -> String {
    format!("seckill:stock:{campaign_id}")
}

pub fn purchase_mark(user_id: i64, campaign_id: i64) -> String {
    format!("user:{user_id}:seckill:{campaign_id}")
}

pub fn purchase_claim(user_id: i64, campaign_id: i64) -> String {
    format!("seckill:claim:{campaign_id}:{user_id}")
}

pub fn campaign(campaign_id: i64) -> String {
    format!("seckill:product:{campaign_id}")
}

pub fn product(product_id: i64) -> String {
    format!("product:{product_id}")
}

pub fn user_profile(user_id: i64) -> String {
    format!("user:profile:{user_id}")
}

pub fn order(order_no: &str) -> String {
    format!("seckill:order:{order_no}")
}
