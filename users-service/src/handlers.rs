//! Handler模块

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::{AppError, AppResult};
use common::models::UserRecord;
use common::response::ApiResponse;

use crate::state::AppState;

/// 列出 users 表中的所有使用者
///
/// 空表同样返回 500，与数据库错误的响应体完全一致。
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "使用者列表", body = ApiResponse<Vec<UserRecord>>),
        (status = 500, description = "无数据或数据库错误")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<UserRecord>>>> {
    let users = state.users.fetch_all_users().await?;
    if users.is_empty() {
        return Err(AppError::NoUsers);
    }

    tracing::info!(count = users.len(), "返回使用者列表");
    Ok(Json(ApiResponse::list(users)))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
