use diesel::pg::Pg;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::Instrument;
use tracing::{info, instrument, warn};

pub type Pool = bb8::Pool<AsyncPgConnection>;
pub type PooledConnection = bb8::PooledConnection<'static, AsyncPgConnection>;

pub const MAX_POOL_SIZE: u32 = 16;

pub async fn establish_connection(
    db_url: String,
) -> Result<Pool, anyhow::Error> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
    let pool = bb8::Pool::builder()
        .max_size(MAX_POOL_SIZE)
        .connection_timeout(Duration::from_secs(10))
        .idle_timeout(Some(Duration::from_secs(180)))
        .retry_connection(true)
        .max_lifetime(Some(Duration::from_secs(3600)))
        .build(config)
        .await?;

    let mut conn = pool.get_owned().await?;
    diesel::sql_query("SELECT 1").execute(&mut conn).await?;

    Ok(pool)
}

#[instrument(skip(pool))]
pub async fn shutdown_pool_with_timeout(
    pool: Arc<Pool>,
    shutdown_timeout: Duration,
) -> Result<(), String> {
    info!("Starting graceful PostgreSQL pool shutdown with timeout");

    let state = pool.state();
    info!(
        "Current pool state - total: {}, idle: {}, active: {}",
        state.connections,
        state.idle_connections,
        state.connections - state.idle_connections
    );

    if state.connections > state.idle_connections {
        let active_count = state.connections - state.idle_connections;
        warn!(
            "Waiting for {} active database connections to finish",
            active_count
        );

        let start = tokio::time::Instant::now();
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;

            let current_state = pool.state();
            let active =
                current_state.connections - current_state.idle_connections;

            if active == 0 {
                info!("All database connections are now idle");
                break;
            }

            if start.elapsed() > shutdown_timeout {
                warn!(
                    "Shutdown timeout reached with {} active connections remaining",
                    active
                );
                break;
            }
        }
    }

    drop(pool);

    info!("PostgreSQL pool shutdown complete");
    Ok(())
}

pub async fn run_migrations<A>(
    async_connection: A,
    migrations: EmbeddedMigrations,
) -> Result<(), Box<dyn Error>>
where
    A: AsyncConnection<Backend = Pg> + 'static,
{
    let mut async_wrapper: AsyncConnectionWrapper<A> =
        AsyncConnectionWrapper::from(async_connection);

    if tokio::runtime::Handle::try_current().is_err() {
        return Err(
            "This function must be called from within a Tokio runtime".into()
        );
    }

    task::spawn_blocking(move || {
        async_wrapper
            .run_pending_migrations(migrations)
            .expect("failed to run migrations");
    })
    .await?;

    Ok(())
}

/// Execute a database operation with a scoped connection.
///
/// The connection is acquired from the pool only when this function is called
/// and returned to the pool as soon as the operation completes, so handlers
/// never hold a connection for their whole lifecycle.
pub async fn with_connection<F, Fut, T, E>(
    pool: &Pool,
    operation: F,
) -> Result<T, WithConnectionError<E>>
where
    F: FnOnce(PooledConnection) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let pool_state_before = pool.state();
    let acquire_span = tracing::info_span!(
        "acquiring_pooled_connection",
        pool.connections = pool_state_before.connections,
        pool.idle_connections = pool_state_before.idle_connections,
    );

    let conn =
        async { pool.get_owned().await.map_err(WithConnectionError::Pool) }
            .instrument(acquire_span)
            .await?;

    let hold_span = tracing::info_span!("holding_db_connection");
    let result = async {
        operation(conn)
            .await
            .map_err(WithConnectionError::Operation)
    }
    .instrument(hold_span)
    .await;

    let pool_state_after = pool.state();
    tracing::debug!(
        pool.connections = pool_state_after.connections,
        pool.idle_connections = pool_state_after.idle_connections,
        "connection_returned_to_pool"
    );

    result
}

/// Error type for with_connection that distinguishes between pool and operation errors
#[derive(Debug)]
pub enum WithConnectionError<E> {
    /// Error acquiring connection from the pool
    Pool(diesel_async::pooled_connection::bb8::RunError),
    /// Error from the database operation itself
    Operation(E),
}

impl<E: std::fmt::Display> std::fmt::Display for WithConnectionError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithConnectionError::Pool(e) => {
                write!(f, "Failed to acquire connection: {}", e)
            }
            WithConnectionError::Operation(e) => {
                write!(f, "Database operation failed: {}", e)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error
    for WithConnectionError<E>
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WithConnectionError::Pool(e) => Some(e),
            WithConnectionError::Operation(e) => Some(e),
        }
    }
}

/// Execute database operations within an atomic transaction.
///
/// All operations either commit together or roll back together; commit and
/// rollback are logged under a `database_transaction` span.
pub async fn with_transaction<F, T, E>(
    pool: &Pool,
    operation: F,
) -> Result<T, WithConnectionError<E>>
where
    F: for<'c> FnOnce(
            &'c mut AsyncPgConnection,
        ) -> futures::future::BoxFuture<'c, Result<T, E>>
        + Send,
    T: Send,
    E: From<diesel::result::Error> + std::error::Error + Send,
{
    with_connection(pool, |mut conn| async move {
        let txn_span = tracing::info_span!("database_transaction");

        async {
            let result = conn
                .transaction::<T, E, _>(|txn_conn| {
                    Box::pin(operation(txn_conn))
                })
                .await;

            match &result {
                Ok(_) => tracing::debug!("transaction_committed"),
                Err(e) => {
                    tracing::error!(error = %e, "transaction_rolled_back")
                }
            }

            result
        }
        .instrument(txn_span)
        .await
    })
    .await
}
