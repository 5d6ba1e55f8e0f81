use utoipa::OpenApi;

/// Main OpenAPI documentation for the sensor data API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::data_api::ingest::handler::handler,
        crate::data_api::query::handler::handler,
    ),
    info(
        title = "Sensor Readings API",
        version = "1.0.0",
        description = "REST API for ingesting raw sensor readings and querying daily power aggregates",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "data", description = "Sensor reading ingestion and range queries")
    )
)]
pub struct DataApiDoc;
