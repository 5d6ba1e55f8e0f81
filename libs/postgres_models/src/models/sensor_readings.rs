use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, serde::Serialize)]
#[diesel(table_name = crate::schema::sensor_readings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SensorReading {
    pub id: i64,
    /// Unix epoch seconds.
    pub recorded_at: i64,
    pub metric_name: String,
    pub metric_value: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::sensor_readings)]
pub struct NewSensorReading {
    pub recorded_at: i64,
    pub metric_name: String,
    pub metric_value: f64,
}

impl SensorReading {
    /// Insert a batch of readings. Callers wanting all-or-nothing semantics
    /// run this inside a transaction.
    pub async fn bulk_insert(
        readings: Vec<NewSensorReading>,
        conn: &mut AsyncPgConnection,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::sensor_readings::dsl::*;

        diesel::insert_into(sensor_readings)
            .values(&readings)
            .execute(conn)
            .await
    }

    /// Readings with `from <= recorded_at <= to`, oldest first.
    pub async fn find_between(
        from: i64,
        to: i64,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::sensor_readings::dsl::*;

        sensor_readings
            .filter(recorded_at.ge(from))
            .filter(recorded_at.le(to))
            .order(recorded_at.asc())
            .select(SensorReading::as_select())
            .load(conn)
            .await
    }
}
