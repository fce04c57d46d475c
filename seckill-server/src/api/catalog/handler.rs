//! Catalog API Handlers

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{Product, UserProfile};

use crate::api::{ApiResponse, AppResult, path_id};
use crate::core::ServerState;

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<ServerState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<ApiResponse<Product>> {
    let product_id = path_id(path, "productId")?;
    let product = state
        .query
        .get_product(product_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(ApiResponse::success(product))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<ServerState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<ApiResponse<UserProfile>> {
    let user_id = path_id(path, "userId")?;
    let user = state
        .query
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(ApiResponse::success(user))
}
