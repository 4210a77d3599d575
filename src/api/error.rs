use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use thiserror::Error;

use crate::engine::{HierarchyError, RejectionKind};

/// Errors returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Rejected(#[from] HierarchyError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Rejected(err) => match err.kind() {
                RejectionKind::NotFound => StatusCode::NOT_FOUND,
                RejectionKind::InvalidField => StatusCode::BAD_REQUEST,
                RejectionKind::CapacityExceeded | RejectionKind::StructuralRuleViolation => {
                    StatusCode::CONFLICT
                }
                RejectionKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Rejected(err) => err.kind().into(),
            ApiError::InternalError(_) => "InternalServerError",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Rejected(HierarchyError::InvalidField { field, .. }) => {
                Some(json!({ "field": field }))
            }
            ApiError::Rejected(HierarchyError::CapacityExceeded(exceeded)) => {
                serde_json::to_value(exceeded).ok()
            }
            ApiError::Rejected(HierarchyError::StructuralRuleViolation(violation)) => {
                Some(json!({ "rule": violation }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            ApiError::Rejected(HierarchyError::StorageUnavailable(_)) => {
                tracing::warn!(error = %self, "Storage unavailable");
                "Storage temporarily unavailable".to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Request rejected");
                self.to_string()
            }
        };

        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message,
            details: self.details(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Field named by a body deserialization error, `body` when there is none.
///
/// Type errors carry the field path as a `path: ` prefix; a missing field is
/// reported at the struct level and names the field in backticks.
fn rejected_field(detail: &str) -> String {
    if let Some((_, rest)) = detail.split_once("missing field `") {
        if let Some((name, _)) = rest.split_once('`') {
            return name.to_string();
        }
    }

    match detail.split_once(": ") {
        Some((path, _))
            if !path.is_empty()
                && path
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')) =>
        {
            path.to_string()
        }
        _ => "body".to_string(),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        let (field, reason) = match &rejection {
            JsonRejection::JsonDataError(_) => {
                let detail = text.split_once(": ").map_or(text.as_str(), |(_, d)| d);
                (rejected_field(detail), detail.to_string())
            }
            JsonRejection::JsonSyntaxError(_) => {
                let detail = text.split_once(": ").map_or(text.as_str(), |(_, d)| d);
                ("body".to_string(), detail.to_string())
            }
            _ => ("body".to_string(), text.clone()),
        };
        ApiError::Rejected(HierarchyError::InvalidField { field, reason })
    }
}

/// Response for a handler that panicked
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::InternalError(detail).into_response()
}
