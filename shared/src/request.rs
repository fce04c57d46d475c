//! Request / response DTOs for the seckill API

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Purchase request body: `{ "userId": 1, "seckillId": 1 }`
///
/// Both ids are required and positive; validation runs before any cache or
/// store access.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[validate(
        required(message = "userId is required"),
        range(min = 1, message = "userId must be positive")
    )]
    pub user_id: Option<i64>,
    #[validate(
        required(message = "seckillId is required"),
        range(min = 1, message = "seckillId must be positive")
    )]
    pub seckill_id: Option<i64>,
}

impl PurchaseRequest {
    pub fn new(user_id: i64, seckill_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            seckill_id: Some(seckill_id),
        }
    }

    /// Validated `(user_id, seckill_id)` pair
    pub fn ids(&self) -> Result<(i64, i64), validator::ValidationErrors> {
        self.validate()?;
        match (self.user_id, self.seckill_id) {
            (Some(user_id), Some(seckill_id)) => Ok((user_id, seckill_id)),
            // validate() already rejects missing ids
            _ => Err(validator::ValidationErrors::new()),
        }
    }
}

/// Purchase response payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
    pub user_id: i64,
    pub seckill_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
    pub message: String,
}

/// Purchase mark check payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCheck {
    pub user_id: i64,
    pub seckill_id: i64,
    pub has_purchased: bool,
}

/// Stock preload payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreloadResult {
    pub seckill_id: i64,
    /// `false` when the campaign had already ended
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

/// Flatten validator errors into one summary line
pub fn validation_summary(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    if messages.is_empty() {
        return "invalid request".to_string();
    }
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        let req: PurchaseRequest =
            serde_json::from_str(r#"{"userId": 3, "seckillId": 8}"#).unwrap();
        assert_eq!(req.ids().unwrap(), (3, 8));
    }

    #[test]
    fn test_missing_id_rejected() {
        let req: PurchaseRequest = serde_json::from_str(r#"{"userId": 3}"#).unwrap();
        let err = req.ids().unwrap_err();
        assert!(validation_summary(&err).contains("seckillId is required"));
    }

    #[test]
    fn test_non_positive_id_rejected() {
        let req = PurchaseRequest::new(0, -5);
        let err = req.ids().unwrap_err();
        let summary = validation_summary(&err);
        assert!(summary.contains("userId must be positive"));
        assert!(summary.contains("seckillId must be positive"));
    }
}
