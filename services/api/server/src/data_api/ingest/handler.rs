use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;
use crate::shared::extractors::request_id::RequestId;

use super::super::error::{ApiError, ErrorRecorder, HandlerResult};
use super::batch::BatchValidator;
use super::models::IngestResponse;

const HANDLER_NAME: &str = "data_ingest";

/// Ingest a batch of sensor readings
///
/// Body is newline-delimited `<timestamp> <metric> <value>` text. The whole
/// batch is validated first and written in one transaction; any invalid line
/// rejects the batch with nothing persisted.
#[utoipa::path(
    post,
    path = "/data",
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 200, description = "Batch accepted and stored", body = IngestResponse),
        (status = 400, description = "Validation failure, nothing written"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "data",
)]
#[tracing::instrument(skip_all, name = "data_ingest")]
pub async fn handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    body: String,
) -> HandlerResult<(StatusCode, Json<IngestResponse>)> {
    let recorder =
        ErrorRecorder::new(&state.metrics, HANDLER_NAME, &request_id);

    let validator = BatchValidator::new(state.config.allowed_metrics.clone());
    let readings = validator.parse_batch(&body).map_err(|e| {
        tracing::info!(
            request_id = %request_id,
            error = %e,
            "Rejected reading batch"
        );
        recorder.record(e.code(), ApiError::bad_request(e.to_string()))
    })?;

    if readings.is_empty() {
        return Ok((StatusCode::OK, Json(IngestResponse { success: true })));
    }

    let lines = readings.len();
    let written = state.store.insert_batch(readings).await.map_err(|e| {
        tracing::error!(
            request_id = %request_id,
            error = %e,
            "Failed to write reading batch"
        );
        recorder.record(e.code(), ApiError::server_error())
    })?;

    state.metrics.record_ingested(written as u64);
    tracing::info!(
        request_id = %request_id,
        lines,
        written,
        "Reading batch stored"
    );

    Ok((StatusCode::OK, Json(IngestResponse { success: true })))
}
