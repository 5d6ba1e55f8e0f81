use async_trait::async_trait;
use diesel_async::RunQueryDsl;
use postgres_models::connection::{
    Pool, WithConnectionError, with_connection, with_transaction,
};
use postgres_models::models::sensor_readings::{
    NewSensorReading, SensorReading,
};

/// Storage collaborator for sensor readings.
///
/// Injected into [`crate::AppState`] at startup so handlers never touch the
/// concrete Postgres pool.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Insert a whole batch atomically: either every reading is written or
    /// none are.
    async fn insert_batch(
        &self,
        readings: Vec<NewSensorReading>,
    ) -> Result<usize, StoreError>;

    /// Readings with `from <= recorded_at <= to` (epoch seconds), oldest
    /// first.
    async fn find_between(
        &self,
        from: i64,
        to: i64,
    ) -> Result<Vec<SensorReading>, StoreError>;

    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Failed to get database connection: {0}")]
    Pool(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "database_error",
            StoreError::Pool(_) => "pool_error",
        }
    }
}

fn connection_error(e: WithConnectionError<diesel::result::Error>) -> StoreError {
    match e {
        WithConnectionError::Pool(e) => StoreError::Pool(e.to_string()),
        WithConnectionError::Operation(e) => StoreError::Database(e),
    }
}

#[derive(Clone)]
pub struct PgReadingStore {
    pool: Pool,
}

impl PgReadingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn insert_batch(
        &self,
        readings: Vec<NewSensorReading>,
    ) -> Result<usize, StoreError> {
        with_transaction(&self.pool, |conn| {
            Box::pin(
                async move { SensorReading::bulk_insert(readings, conn).await },
            )
        })
        .await
        .map_err(connection_error)
    }

    async fn find_between(
        &self,
        from: i64,
        to: i64,
    ) -> Result<Vec<SensorReading>, StoreError> {
        with_connection(&self.pool, |mut conn| async move {
            SensorReading::find_between(from, to, &mut conn).await
        })
        .await
        .map_err(connection_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        with_connection(&self.pool, |mut conn| async move {
            diesel::sql_query("SELECT 1")
                .execute(&mut conn)
                .await
                .map(|_| ())
        })
        .await
        .map_err(connection_error)
    }
}
