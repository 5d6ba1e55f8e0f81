use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::shared::extractors::request_id::RequestId;

use super::super::error::{ApiError, ErrorRecorder, HandlerResult};
use super::aggregate;
use super::models::{MetricPoint, RangeParams};
use super::range;

const HANDLER_NAME: &str = "data_query";

/// Query readings over an inclusive date range
///
/// Returns every raw reading in the range grouped by UTC day, each day
/// followed by a synthetic average Power entry. An empty range yields `[]`.
#[utoipa::path(
    get,
    path = "/data",
    params(RangeParams),
    responses(
        (status = 200, description = "Readings and daily Power points", body = [MetricPoint]),
        (status = 400, description = "Missing or invalid range parameters"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "data",
)]
#[tracing::instrument(skip_all, name = "data_query")]
pub async fn handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(params): Query<RangeParams>,
) -> HandlerResult<(StatusCode, Json<Vec<MetricPoint>>)> {
    let recorder =
        ErrorRecorder::new(&state.metrics, HANDLER_NAME, &request_id);

    let (from, to) =
        range::parse_range(params.from.as_deref(), params.to.as_deref())
            .map_err(|e| {
                recorder.record(e.code(), ApiError::bad_request(e.to_string()))
            })?;

    tracing::info!(
        request_id = %request_id,
        from,
        to,
        "Readings range query"
    );

    let readings = state.store.find_between(from, to).await.map_err(|e| {
        tracing::error!(
            request_id = %request_id,
            error = %e,
            "Failed to query readings"
        );
        recorder.record(e.code(), ApiError::server_error())
    })?;

    Ok((StatusCode::OK, Json(aggregate::daily_series(readings))))
}
