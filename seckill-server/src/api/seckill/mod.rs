//! 秒杀 API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/seckill/do | POST | 秒杀下单 `{userId, seckillId}` |
//! | /api/seckill/preload/{id} | POST | 库存预热 |
//! | /api/seckill/check/{userId}/{seckillId} | GET | 是否已购买 |
//! | /api/seckill/list | GET | 进行中 / 即将开始的活动 |
//! | /api/seckill/product/{id} | GET | 活动详情 |
//! | /api/seckill/add | POST | 创建活动 (自动预热) |
//! | /api/seckill/close/{id} | POST | 关闭活动 |
//! | /api/seckill/orders/{userId} | GET | 用户订单 |
//! | /api/seckill/order/{orderNo} | GET | 订单详情 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/seckill", routes())
}

fn routes() -> Router<ServerState> {
    let purchase_routes = Router::new()
        .route("/do", post(handler::purchase))
        .route("/check/{user_id}/{seckill_id}", get(handler::check));

    let campaign_routes = Router::new()
        .route("/list", get(handler::list))
        .route("/product/{id}", get(handler::get_campaign))
        .route("/preload/{id}", post(handler::preload))
        .route("/add", post(handler::add))
        .route("/close/{id}", post(handler::close));

    let order_routes = Router::new()
        .route("/orders/{user_id}", get(handler::list_user_orders))
        .route("/order/{order_no}", get(handler::get_order));

    purchase_routes.merge(campaign_routes).merge(order_routes)
}
