use serde::Serialize;
use utoipa::ToSchema;

/// Acknowledgement for an accepted reading batch
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub success: bool,
}
