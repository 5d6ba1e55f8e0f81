use anyhow::Context;
use axum::{http::StatusCode, response::Json};
use sensor_api::metrics::ServerMetrics;
use sensor_api::shutdown::{ShutdownCoordinator, listen_for_shutdown_signals};
use sensor_api::store::PgReadingStore;
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer,
    trace::TraceLayer,
};

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

const VERSION: Option<&'static str> = option_env!("VERSION");
const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!("./../../../db/migrations");

async fn fallback_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested endpoint does not exist",
            "status": 404
        })),
    )
}

fn main() {
    let version = VERSION.unwrap_or("unknown").to_string();
    let config = sensor_api::Config::load().expect("Failed to load config");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
        .block_on(async {
            if let Err(e) = setup(config, version).await {
                tracing::error!("Fatal error during setup: {e:#}");
                std::process::exit(1);
            }
        });
}

async fn setup(
    config: sensor_api::Config,
    _version: String,
) -> anyhow::Result<()> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize tracing filter")?;

    let use_json = config.log_format != "pretty";

    if use_json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_target(true)
            .with_level(true)
            .json();
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .pretty();
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    };

    let addr: String = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting sensor-api service at: {addr}");

    let db_pool =
        postgres_models::connection::establish_connection(config.database_url())
            .await
            .context("Failed to connect to Postgres")?;

    let db_pool_conn = db_pool
        .get_owned()
        .await
        .context("Failed to get connection from pool for migrations")?;

    postgres_models::connection::run_migrations(db_pool_conn, MIGRATIONS)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to run database migrations")?;

    let shutdown = Arc::new(ShutdownCoordinator::new(Some(db_pool.clone())));

    let metrics = Arc::new(
        ServerMetrics::new(None).context("Failed to create server metrics")?,
    );

    let app_state = sensor_api::AppState {
        store: Arc::new(PgReadingStore::new(db_pool)),
        metrics: metrics.clone(),
        config: Arc::new(config),
        shutdown: shutdown.clone(),
    };
    let app = axum::Router::new()
        .route("/health", {
            let state = app_state.clone();
            axum::routing::get(move || {
                let state = state.clone();
                async move { sensor_api::health::handler(state).await }
            })
        })
        .route(
            "/version",
            axum::routing::get(|| async { VERSION.unwrap_or("unknown") }),
        )
        .route("/metrics", {
            let metrics = metrics.clone();
            axum::routing::get(move || {
                let metrics = metrics.clone();
                async move {
                    (
                        axum::http::StatusCode::OK,
                        [(
                            axum::http::header::CONTENT_TYPE,
                            "text/plain; charset=utf-8",
                        )],
                        metrics.gather_metrics(),
                    )
                }
            })
        })
        .merge(sensor_api::get_data_api_routes(app_state.clone()))
        .fallback(fallback_handler)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::new())
        .merge(sensor_api::get_openapi_routes());

    // Spawn shutdown signal handler
    let shutdown_handle = shutdown.clone();
    tokio::spawn(async move {
        listen_for_shutdown_signals().await;
        shutdown_handle.shutdown().await;
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    let shutdown_for_serve = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_for_serve.wait_for_shutdown().await
        })
        .await
        .context("Server exited with error")?;

    Ok(())
}
