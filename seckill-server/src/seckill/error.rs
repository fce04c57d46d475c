use crate::cache::CacheError;
use crate::db::StoreError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Seckill service errors
///
/// Business rejections of a purchase are not errors, they are
/// [`PurchaseOutcome`](super::PurchaseOutcome) variants.
#[derive(Debug, Error)]
pub enum SeckillError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Order transaction failed definitively (rolled back)
    #[error("Order persistence failed: {0}")]
    OrderPersist(StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timed out: {0}")]
    Timeout(&'static str),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(i64),

    #[error("Campaign not live: {0}")]
    CampaignNotLive(i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Campaign start time must be earlier than end time")]
    InvalidWindow,
}

pub type SeckillResult<T> = Result<T, SeckillError>;

impl SeckillError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SeckillError::Cache(_) => ErrorCode::CacheError,
            SeckillError::Store(StoreError::Timeout) => ErrorCode::TimeoutError,
            SeckillError::Store(StoreError::DuplicateOrder { .. }) => ErrorCode::AlreadyPurchased,
            SeckillError::Store(StoreError::NotFound(_)) => ErrorCode::NotFound,
            SeckillError::Store(_) => ErrorCode::DatabaseError,
            SeckillError::OrderPersist(StoreError::Timeout) => ErrorCode::TimeoutError,
            SeckillError::OrderPersist(_) => ErrorCode::OrderCreateFailed,
            SeckillError::Serialization(_) => ErrorCode::InternalError,
            SeckillError::Timeout(_) => ErrorCode::TimeoutError,
            SeckillError::CampaignNotFound(_) => ErrorCode::CampaignNotFound,
            SeckillError::CampaignNotLive(_) => ErrorCode::CampaignNotLive,
            SeckillError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            SeckillError::UserNotFound(_) => ErrorCode::UserNotFound,
            SeckillError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            SeckillError::Validation(_) => ErrorCode::ValidationFailed,
            SeckillError::InvalidWindow => ErrorCode::CampaignInvalidWindow,
        }
    }
}

impl From<SeckillError> for AppError {
    fn from(err: SeckillError) -> Self {
        let code = err.code();
        match err {
            // Field messages are safe to show
            SeckillError::Validation(msg) => AppError::validation(msg),
            SeckillError::CampaignNotFound(id)
            | SeckillError::CampaignNotLive(id)
            | SeckillError::ProductNotFound(id)
            | SeckillError::UserNotFound(id) => AppError::new(code).with_detail("id", id),
            SeckillError::OrderNotFound(order_no) => {
                AppError::new(code).with_detail("orderNo", order_no)
            }
            SeckillError::InvalidWindow => AppError::new(code),
            // Infrastructure detail stays in the log
            other => {
                tracing::warn!(
                    error = %other,
                    code = %code,
                    retryable = code.is_retryable(),
                    "Seckill request failed"
                );
                AppError::new(code)
            }
        }
    }
}
