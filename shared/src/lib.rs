//! Shared types for the seckill backend
//!
//! Common types used across crates: error codes, the in-band response
//! envelope, domain models, and request DTOs.

pub mod error;
pub mod models;
pub mod request;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
