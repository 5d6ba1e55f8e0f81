use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::metrics::ServerMetrics;

pub type HandlerResult<T> = Result<T, ApiError>;

/// Wire error for the data API: `{"success": false, "message": ...}` plus a
/// status code. Server-side failure detail never leaves the logs.
#[derive(Debug)]
pub struct ApiError {
    pub(crate) status_code: axum::http::StatusCode,
    pub(crate) message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: axum::http::StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn server_error() -> Self {
        Self {
            status_code: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            message: "Server error".to_string(),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = axum::Json(json!({
            "success": false,
            "message": self.message,
        }));

        (self.status_code, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Records error metrics before handing the wire error back to the caller.
///
/// Replaces the per-handler `record_err` closures with a single reusable type.
pub struct ErrorRecorder<'a> {
    metrics: &'a Arc<ServerMetrics>,
    handler_name: &'a str,
    request_id: &'a Uuid,
}

impl<'a> ErrorRecorder<'a> {
    pub fn new(
        metrics: &'a Arc<ServerMetrics>,
        handler_name: &'a str,
        request_id: &'a Uuid,
    ) -> Self {
        Self {
            metrics,
            handler_name,
            request_id,
        }
    }

    pub fn record(&self, code: &str, error: ApiError) -> ApiError {
        self.metrics.record_error(self.handler_name, code);
        tracing::debug!(
            request_id = %self.request_id,
            handler = self.handler_name,
            code,
            "recorded_request_error"
        );
        error
    }
}
