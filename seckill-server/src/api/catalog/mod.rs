//! 商品 / 用户只读接口
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/products/{id} | GET | 商品详情 |
//! | /api/users/{id} | GET | 用户资料 (不含密码) |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/products/{id}", get(handler::get_product))
        .route("/api/users/{id}", get(handler::get_user))
}
