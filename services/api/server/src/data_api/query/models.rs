use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for the readings range query
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeParams {
    /// Start of range (inclusive); RFC 3339, `YYYY-MM-DDTHH:MM:SS` or
    /// `YYYY-MM-DD`
    pub from: Option<String>,
    /// End of range (inclusive); same formats as `from`
    pub to: Option<String>,
}

/// One entry of the query response: a raw reading, or the synthetic daily
/// Power point
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct MetricPoint {
    /// ISO-8601 UTC time, e.g. `2023-11-14T22:13:20.000Z`
    #[schema(example = "2023-11-14T22:13:20.000Z")]
    pub time: String,
    #[schema(example = "Voltage")]
    pub name: String,
    #[schema(example = 120.0)]
    pub value: f64,
}
