use axum::Router;

pub mod error;
pub mod ingest;
pub mod query;

pub fn get_routes(state: crate::AppState) -> Router {
    Router::new()
        .route(
            "/data",
            axum::routing::get(query::handler::handler)
                .post(ingest::handler::handler),
        )
        .with_state(state)
}
