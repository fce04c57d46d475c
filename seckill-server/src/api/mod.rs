//! API 路由模块
//!
//! 所有接口统一返回 HTTP 200，业务结果放在 [`ApiResponse`] 的
//! `success` / `code` / `message` 中。请求体、路径参数解析失败也一样。
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`seckill`] - 秒杀下单、预热、活动管理与订单查询
//! - [`catalog`] - 商品 / 用户只读接口

pub mod catalog;
pub mod health;
pub mod seckill;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path};
use axum::middleware as axum_middleware;
use http::{HeaderName, HeaderValue};
use shared::error::{AppError, ErrorCode};
use std::time::Duration;
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;
use crate::middleware;

// Re-export common types for handlers
pub use shared::{ApiResponse, AppResult};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(seckill::router())
        .merge(catalog::router())
        .merge(health::router())
        .fallback(fallback)
}

/// Build the application with all middleware
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    let request_timeout = Duration::from_millis(state.config.request_timeout_ms);

    build_router()
        // Request timeout, answered in-band like every other error
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout),
        )
        .layer(CorsLayer::permissive())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::timeout()
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        AppError::new(ErrorCode::InternalError)
    }
}

async fn fallback(uri: http::Uri) -> AppError {
    AppError::not_found(format!("route {}", uri.path()))
}

// ========== Extraction helpers ==========

/// Unwrap a JSON body, turning a malformed body into an in-band error
///
/// Only a short fixed reason goes back to the client; the parser message
/// stays in the debug log.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            Err(
                AppError::with_message(ErrorCode::InvalidRequest, "请求体格式错误")
                    .with_detail("reason", rejection_reason(&rejection)),
            )
        }
    }
}

fn rejection_reason(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::JsonDataError(_) => "invalid field type",
        JsonRejection::JsonSyntaxError(_) => "malformed JSON",
        JsonRejection::MissingJsonContentType(_) => "expected application/json",
        _ => "unreadable body",
    }
}

/// Extract a positive id path segment
pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>, name: &str) -> AppResult<i64> {
    match path {
        Ok(Path(id)) if id > 0 => Ok(id),
        Ok(Path(_)) => Err(AppError::validation(format!("{name} must be positive"))),
        Err(_) => Err(AppError::validation(format!("{name} must be a positive integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_passthrough() {
        let ok: AppResult<i64> = json_body(Ok(Json(5)));
        assert_eq!(ok.unwrap(), 5);
    }

    #[test]
    fn test_json_rejection_reason_is_fixed() {
        let rejection = JsonRejection::MissingJsonContentType(Default::default());
        let err = json_body::<i64>(Err(rejection)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(err.message, "请求体格式错误");
        assert_eq!(
            err.details.unwrap().get("reason").unwrap(),
            "expected application/json"
        );
    }

    #[test]
    fn test_path_id() {
        assert_eq!(path_id(Ok(Path(3)), "id").unwrap(), 3);
        let err = path_id(Ok(Path(0)), "userId").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("userId"));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_error_code() {
        let elapsed: BoxError = Box::new(tower::timeout::error::Elapsed::new());
        let err = handle_middleware_error(elapsed).await;
        assert_eq!(err.code, ErrorCode::TimeoutError);

        let other: BoxError = "boom".into();
        let err = handle_middleware_error(other).await;
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
