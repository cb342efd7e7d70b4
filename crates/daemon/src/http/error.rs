// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API error shape: `{ok: false, error, detail?}` with 4xx/5xx codes.

use crate::ctx::CoreError;
use crate::state_machine::StateMachineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sheratan_journal::JournalError;
use sheratan_queue::QueueError;
use sheratan_store::StoreError;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// An error response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), detail: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "api error");
        }
        let mut body = serde_json::json!({
            "ok": false,
            "error": self.message,
        });
        if let Some(detail) = self.detail {
            body["detail"] = detail;
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, ref id } => {
                ApiError::not_found(format!("{entity} not found: {id}"))
            }
            StoreError::Transition(t) => ApiError::conflict(t.to_string()),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Duplicate { job_id } => {
                ApiError::conflict(format!("job {job_id} already enqueued"))
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<JournalError> for ApiError {
    fn from(e: JournalError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<StateMachineError> for ApiError {
    fn from(e: StateMachineError) -> Self {
        match e {
            StateMachineError::Invalid(t) => ApiError::conflict(t.to_string()),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Store(inner) => inner.into(),
            CoreError::Queue(inner) => inner.into(),
            CoreError::Journal(inner) => inner.into(),
            CoreError::State(inner) => inner.into(),
            CoreError::Io(inner) => ApiError::internal(inner.to_string()),
        }
    }
}
