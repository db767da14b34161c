//! API response envelope.
//!
//! Every endpoint that returns data wraps it in the same shape, tagged by
//! `status`:
//!
//! ```json
//! {"status":"success","count":2,"data":[...]}
//! {"status":"error","message":"..."}
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Standard API response wrapper.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// `success` or `error`.
    pub status: ResponseStatus,

    /// Number of items in `data` (list responses only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Response data (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Human-readable error message (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// Creates a successful list response; `count` is the list length.
    pub fn list(items: Vec<T>) -> Self {
        Self {
            status: ResponseStatus::Success,
            count: Some(items.len()),
            data: Some(items),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    /// Creates an error response.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            count: None,
            data: None,
            message: Some(message.into()),
        }
    }
}
