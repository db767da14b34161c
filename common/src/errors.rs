//! Error types shared by the users service.
//!
//! Every variant renders as the same HTTP 500 error envelope. The cause is
//! written to the log, never to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Message returned to clients whenever the user list cannot be served.
pub const USERS_UNAVAILABLE_MESSAGE: &str = "無法取得使用者資料或資料庫連線錯誤";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Could not open a connection (bad credentials, unreachable host).
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// The statement failed (malformed SQL, missing table or column).
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    #[error("failed to decode column `{column}`: {message}")]
    RowDecode { column: String, message: String },

    #[error("column `{column}` has unsupported type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },

    /// The query succeeded but the table holds no rows.
    #[error("users table returned no rows")]
    NoUsers,

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP status used when this error reaches a handler boundary.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::NoUsers => tracing::warn!("{}", self),
            _ => tracing::error!(error = %self, "failed to load users"),
        }

        let body = ApiResponse::err(USERS_UNAVAILABLE_MESSAGE);
        (self.status_code(), Json(body)).into_response()
    }
}
