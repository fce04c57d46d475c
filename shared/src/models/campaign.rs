//! Seckill Campaign Model (秒杀活动)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Campaign status
///
/// Only transition allowed once a campaign exists: `Active -> Closed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Active,
    Closed,
}

/// Seckill campaign entity
///
/// A time-boxed listing of one product at `seckill_price` with `stock_count`
/// units. The live window is `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: i64,
    /// Product reference
    pub product_id: i64,
    pub seckill_price: Decimal,
    /// Configured stock, seeded into the cache counter by the preloader
    pub stock_count: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: CampaignStatus,
    pub create_time: DateTime<Utc>,
}

impl Campaign {
    pub fn is_active(&self) -> bool {
        self.status == CampaignStatus::Active
    }

    /// Active and `start_time <= now < end_time`
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now >= self.start_time && now < self.end_time
    }

    /// Whether the campaign window has passed
    pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Time left until `end_time`, `None` once the campaign has ended
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.end_time - now)
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
    }
}

/// Create campaign payload (admin)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_window", skip_on_field_errors = false))]
pub struct CampaignCreate {
    #[validate(range(min = 1, message = "productId must be positive"))]
    pub product_id: i64,
    #[validate(custom(function = "validate_price"))]
    pub seckill_price: Decimal,
    pub stock_count: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("negative_price");
        err.message = Some("seckillPrice must not be negative".into());
        return Err(err);
    }
    Ok(())
}

const INVALID_WINDOW: &str = "invalid_window";

fn validate_window(create: &CampaignCreate) -> Result<(), ValidationError> {
    if create.start_time >= create.end_time {
        let mut err = ValidationError::new(INVALID_WINDOW);
        err.message = Some("startTime must be earlier than endTime".into());
        return Err(err);
    }
    Ok(())
}

/// Whether `errors` include the `start < end` window check
pub fn is_invalid_window(errors: &ValidationErrors) -> bool {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .any(|err| err.code == INVALID_WINDOW)
}
