//! Unified error codes for the seckill backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: User errors
//! - 4xxx: Order errors
//! - 6xxx: Campaign / product errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: User ====================
    /// User not found
    UserNotFound = 1001,
    /// User is disabled
    UserDisabled = 1002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// User already holds an order for this campaign
    AlreadyPurchased = 4002,
    /// Order persistence failed
    OrderCreateFailed = 4003,

    // ==================== 6xxx: Campaign / Product ====================
    /// Campaign not found
    CampaignNotFound = 6001,
    /// Campaign is closed, not started yet, or already ended
    CampaignNotLive = 6002,
    /// Campaign stock exhausted
    SoldOut = 6003,
    /// Campaign time window is invalid
    CampaignInvalidWindow = 6004,
    /// Product not found
    ProductNotFound = 6101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Cache error
    CacheError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether a client may retry the same request later
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::DatabaseError
                | ErrorCode::CacheError
                | ErrorCode::TimeoutError
                | ErrorCode::OrderCreateFailed
        )
    }

    /// Get the user-facing message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "操作成功",
            ErrorCode::ValidationFailed => "参数校验失败",
            ErrorCode::NotFound => "资源不存在",
            ErrorCode::InvalidRequest => "无效请求",

            // User
            ErrorCode::UserNotFound => "用户不存在",
            ErrorCode::UserDisabled => "用户已禁用",

            // Order
            ErrorCode::OrderNotFound => "订单不存在",
            ErrorCode::AlreadyPurchased => "您已经购买过该商品，不能重复购买",
            ErrorCode::OrderCreateFailed => "订单创建失败，请稍后重试",

            // Campaign / Product
            ErrorCode::CampaignNotFound => "秒杀商品不存在",
            ErrorCode::CampaignNotLive => "秒杀活动未开始或已结束",
            ErrorCode::SoldOut => "秒杀失败，库存不足",
            ErrorCode::CampaignInvalidWindow => "秒杀开始时间必须早于结束时间",
            ErrorCode::ProductNotFound => "商品不存在",

            // System
            ErrorCode::InternalError => "服务器内部错误",
            ErrorCode::DatabaseError => "数据库错误",
            ErrorCode::CacheError => "缓存服务不可用",
            ErrorCode::TimeoutError => "操作超时，请稍后重试",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            // User
            1001 => Ok(ErrorCode::UserNotFound),
            1002 => Ok(ErrorCode::UserDisabled),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::AlreadyPurchased),
            4003 => Ok(ErrorCode::OrderCreateFailed),

            // Campaign / Product
            6001 => Ok(ErrorCode::CampaignNotFound),
            6002 => Ok(ErrorCode::CampaignNotLive),
            6003 => Ok(ErrorCode::SoldOut),
            6004 => Ok(ErrorCode::CampaignInvalidWindow),
            6101 => Ok(ErrorCode::ProductNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::CacheError),
            9004 => Ok(ErrorCode::TimeoutError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip_u16() {
        for code in [
            ErrorCode::Success,
            ErrorCode::UserNotFound,
            ErrorCode::AlreadyPurchased,
            ErrorCode::SoldOut,
            ErrorCode::TimeoutError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_error_code_serializes_as_number() {
        let json = serde_json::to_string(&ErrorCode::SoldOut).unwrap();
        assert_eq!(json, "6003");
        let code: ErrorCode = serde_json::from_str("6002").unwrap();
        assert_eq!(code, ErrorCode::CampaignNotLive);
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ErrorCode::CacheError.is_retryable());
        assert!(ErrorCode::TimeoutError.is_retryable());
        assert!(!ErrorCode::SoldOut.is_retryable());
        assert!(!ErrorCode::AlreadyPurchased.is_retryable());
    }
}
