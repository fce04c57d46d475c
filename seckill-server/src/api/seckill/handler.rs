//! Seckill API Handlers

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{Campaign, CampaignCreate, SeckillOrder, UserStatus};
use shared::request::{
    PreloadResult, PurchaseCheck, PurchaseRequest, PurchaseResult, validation_summary,
};

use crate::api::{ApiResponse, AppResult, json_body, path_id};
use crate::core::ServerState;
use crate::seckill::{PreloadOutcome, PurchaseOutcome};

const SUCCESS_MESSAGE: &str = "秒杀成功";

/// POST /api/seckill/do - 秒杀下单
pub async fn purchase(
    State(state): State<ServerState>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> AppResult<ApiResponse<PurchaseResult>> {
    let request = json_body(payload)?;
    let (user_id, seckill_id) = request
        .ids()
        .map_err(|e| AppError::validation(validation_summary(&e)))?;

    let user = state
        .query
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    if user.status == UserStatus::Disabled {
        return Err(AppError::new(ErrorCode::UserDisabled));
    }

    // Detached so a dropped connection cannot stop it between reserve and persist
    let orchestrator = state.orchestrator.clone();
    let outcome = tokio::spawn(async move { orchestrator.purchase(user_id, seckill_id).await })
        .await
        .map_err(|e| {
            tracing::error!(user_id, seckill_id, error = %e, "Purchase task failed");
            AppError::new(ErrorCode::InternalError)
        })??;

    match outcome {
        PurchaseOutcome::Succeeded(order) => Ok(ApiResponse::success_with_message(
            SUCCESS_MESSAGE,
            PurchaseResult {
                user_id,
                seckill_id,
                order_no: Some(order.order_no),
                message: SUCCESS_MESSAGE.to_string(),
            },
        )),
        rejected => Ok(ApiResponse::error(
            &AppError::new(rejected.code())
                .with_detail("userId", user_id)
                .with_detail("seckillId", seckill_id),
        )),
    }
}

/// GET /api/seckill/check/{userId}/{seckillId} - 是否已购买
pub async fn check(
    State(state): State<ServerState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> AppResult<ApiResponse<PurchaseCheck>> {
    let (user_id, seckill_id) = match path {
        Ok(Path((user_id, seckill_id))) if user_id > 0 && seckill_id > 0 => (user_id, seckill_id),
        _ => {
            return Err(AppError::validation(
                "userId and seckillId must be positive integers",
            ));
        }
    };

    let has_purchased = state.query.has_purchased(user_id, seckill_id).await?;
    Ok(ApiResponse::success(PurchaseCheck {
        user_id,
        seckill_id,
        has_purchased,
    }))
}

/// POST /api/seckill/preload/{id} - 库存预热
pub async fn preload(
    State(state): State<ServerState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<ApiResponse<PreloadResult>> {
    let seckill_id = path_id(path, "seckillId")?;

    let response = match state.query.preloader().preload(seckill_id).await? {
        PreloadOutcome::Loaded { stock, ttl } => ApiResponse::success_with_message(
            "库存预热成功",
            PreloadResult {
                seckill_id,
                loaded: true,
                stock: Some(stock),
                ttl_seconds: Some(ttl.as_secs()),
            },
        ),
        PreloadOutcome::Ended => ApiResponse::success_with_message(
            "秒杀活动已结束，无需预热",
            PreloadResult {
                seckill_id,
                loaded: false,
                stock: None,
                ttl_seconds: None,
            },
        ),
    };
    Ok(response)
}

/// GET /api/seckill/list - 活动列表
pub async fn list(State(state): State<ServerState>) -> AppResult<ApiResponse<Vec<Campaign>>> {
    let campaigns = state.query.list_campaigns().await?;
    Ok(ApiResponse::success(campaigns))
}

/// GET /api/seckill/product/{id} - 活动详情
pub async fn get_campaign(
    State(state): State<ServerState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<ApiResponse<Campaign>> {
    let seckill_id = path_id(path, "seckillId")?;
    let campaign = state
        .query
        .get_campaign(seckill_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CampaignNotFound))?;
    Ok(ApiResponse::success(campaign))
}

/// POST /api/seckill/add - 创建活动
pub async fn add(
    State(state): State<ServerState>,
    payload: Result<Json<CampaignCreate>, JsonRejection>,
) -> AppResult<ApiResponse<Campaign>> {
    let create = json_body(payload)?;
    let campaign = state.query.add_campaign(create).await?;
    Ok(ApiResponse::success_with_message("添加成功", campaign))
}

/// POST /api/seckill/close/{id} - 关闭活动
pub async fn close(
    State(state): State<ServerState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<ApiResponse<Campaign>> {
    let seckill_id = path_id(path, "seckillId")?;
    let campaign = state.query.close_campaign(seckill_id).await?;
    Ok(ApiResponse::success_with_message("活动已关闭", campaign))
}

/// GET /api/seckill/orders/{userId} - 用户订单
pub async fn list_user_orders(
    State(state): State<ServerState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<ApiResponse<Vec<SeckillOrder>>> {
    let user_id = path_id(path, "userId")?;
    let orders = state.query.list_user_orders(user_id).await?;
    Ok(ApiResponse::success(orders))
}

/// GET /api/seckill/order/{orderNo} - 订单详情
pub async fn get_order(
    State(state): State<ServerState>,
    Path(order_no): Path<String>,
) -> AppResult<ApiResponse<SeckillOrder>> {
    let order = state
        .query
        .get_order_by_no(&order_no)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("orderNo", order_no))?;
    Ok(ApiResponse::success(order))
}
