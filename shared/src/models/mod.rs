//! Data models
//!
//! Shared between seckill-server and its clients (via API).
//! All IDs are `i64`; timestamps are UTC.

pub mod campaign;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use campaign::*;
pub use order::*;
pub use product::*;
pub use user::*;
