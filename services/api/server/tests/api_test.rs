use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use mockall::mock;
use mockall::predicate::eq;
use serde_json::{Value, json};

use postgres_models::models::sensor_readings::{
    NewSensorReading, SensorReading,
};
use sensor_api::metrics::ServerMetrics;
use sensor_api::shutdown::ShutdownCoordinator;
use sensor_api::store::{ReadingStore, StoreError};
use sensor_api::{AppState, Config};

mock! {
    Store {}

    #[async_trait]
    impl ReadingStore for Store {
        async fn insert_batch(
            &self,
            readings: Vec<NewSensorReading>,
        ) -> Result<usize, StoreError>;

        async fn find_between(
            &self,
            from: i64,
            to: i64,
        ) -> Result<Vec<SensorReading>, StoreError>;

        async fn ping(&self) -> Result<(), StoreError>;
    }
}

fn test_state(store: MockStore) -> AppState {
    let config: Config = serde_json::from_value(json!({
        "db_user": "test",
        "db_host": "localhost",
        "db_name": "test",
        "db_pass": "test",
    }))
    .expect("test config must deserialize");

    AppState {
        store: Arc::new(store),
        metrics: Arc::new(
            ServerMetrics::new(None).expect("metrics must build"),
        ),
        config: Arc::new(config),
        shutdown: Arc::new(ShutdownCoordinator::new(None)),
    }
}

fn build_test_server(store: MockStore) -> TestServer {
    TestServer::new(sensor_api::get_data_api_routes(test_state(store)))
        .unwrap()
}

fn stored(id: i64, recorded_at: i64, name: &str, value: f64) -> SensorReading {
    SensorReading {
        id,
        recorded_at,
        metric_name: name.to_string(),
        metric_value: value,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_post_valid_batch_writes_every_line() {
    let expected = vec![
        NewSensorReading {
            recorded_at: 1700000000,
            metric_name: "Voltage".to_string(),
            metric_value: 120.0,
        },
        NewSensorReading {
            recorded_at: 1700000000,
            metric_name: "Current".to_string(),
            metric_value: 2.0,
        },
    ];

    let mut store = MockStore::new();
    store
        .expect_insert_batch()
        .withf(move |readings| *readings == expected)
        .times(1)
        .returning(|readings| Ok(readings.len()));

    let server = build_test_server(store);
    let response = server
        .post("/data")
        .text("1700000000 Voltage 120\n1700000000 Current 2")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_post_unknown_metric_is_rejected_and_nothing_written() {
    let mut store = MockStore::new();
    store.expect_insert_batch().never();

    let server = build_test_server(store);
    let response = server.post("/data").text("1700000000 Wattage 5").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Wattage")
    );
}

#[tokio::test]
async fn test_post_invalid_line_anywhere_rejects_whole_batch() {
    let mut store = MockStore::new();
    store.expect_insert_batch().never();

    let server = build_test_server(store);
    let response = server
        .post("/data")
        .text("1700000000 Voltage 120\n1700000000 Current 2\nabc Voltage 5")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("timestamp")
    );
}

#[tokio::test]
async fn test_post_malformed_timestamp() {
    let mut store = MockStore::new();
    store.expect_insert_batch().never();

    let server = build_test_server(store);
    let response = server.post("/data").text("abc Voltage 120").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("timestamp")
    );
}

#[tokio::test]
async fn test_post_malformed_line() {
    let mut store = MockStore::new();
    store.expect_insert_batch().never();

    let server = build_test_server(store);
    let response = server.post("/data").text("1700000000 Voltage").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Malformed")
    );
}

#[tokio::test]
async fn test_post_non_finite_value() {
    let mut store = MockStore::new();
    store.expect_insert_batch().never();

    let server = build_test_server(store);
    let response = server.post("/data").text("1700000000 Voltage NaN").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_storage_failure_is_opaque() {
    let mut store = MockStore::new();
    store
        .expect_insert_batch()
        .times(1)
        .returning(|_| Err(StoreError::Pool("connection refused".to_string())));

    let server = build_test_server(store);
    let response = server.post("/data").text("1700000000 Voltage 120").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({ "success": false, "message": "Server error" })
    );
}

#[tokio::test]
async fn test_get_empty_range_returns_empty_array() {
    let mut store = MockStore::new();
    store
        .expect_find_between()
        .with(eq(1699920000i64), eq(1700006400i64))
        .times(1)
        .returning(|_, _| Ok(vec![]));

    let server = build_test_server(store);
    let response = server
        .get("/data")
        .add_query_param("from", "2023-11-14")
        .add_query_param("to", "2023-11-15")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_get_returns_readings_and_daily_power() {
    let mut store = MockStore::new();
    store
        .expect_find_between()
        .with(eq(1699920000i64), eq(1700006400i64))
        .times(1)
        .returning(|_, _| {
            Ok(vec![
                stored(1, 1700000000, "Voltage", 120.0),
                stored(2, 1700000000, "Current", 2.0),
            ])
        });

    let server = build_test_server(store);
    let response = server
        .get("/data")
        .add_query_param("from", "2023-11-14")
        .add_query_param("to", "2023-11-15")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!([
            { "time": "2023-11-14T22:13:20.000Z", "name": "Voltage", "value": 120.0 },
            { "time": "2023-11-14T22:13:20.000Z", "name": "Current", "value": 2.0 },
            { "time": "2023-11-14T00:00:00.000Z", "name": "Power", "value": 240.0 },
        ])
    );
}

#[tokio::test]
async fn test_get_missing_range_parameters() {
    let mut store = MockStore::new();
    store.expect_find_between().never();

    let server = build_test_server(store);
    let response = server.get("/data").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "success": false,
            "message": "from and to query parameters are required"
        })
    );
}

#[tokio::test]
async fn test_get_invalid_date_format() {
    let mut store = MockStore::new();
    store.expect_find_between().never();

    let server = build_test_server(store);
    let response = server
        .get("/data")
        .add_query_param("from", "not-a-date")
        .add_query_param("to", "2023-11-15")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({ "success": false, "message": "Invalid date format" })
    );
}

#[tokio::test]
async fn test_get_storage_failure_is_opaque() {
    let mut store = MockStore::new();
    store
        .expect_find_between()
        .times(1)
        .returning(|_, _| Err(StoreError::Pool("pool exhausted".to_string())));

    let server = build_test_server(store);
    let response = server
        .get("/data")
        .add_query_param("from", "2023-11-14")
        .add_query_param("to", "2023-11-15")
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({ "success": false, "message": "Server error" })
    );
}

#[tokio::test]
async fn test_health_reports_store_status() {
    let mut store = MockStore::new();
    store.expect_ping().times(1).returning(|| Ok(()));

    let (status, body) = sensor_api::health::handler(test_state(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.0.status, sensor_api::health::HealthStatus::Healthy);

    let mut store = MockStore::new();
    store
        .expect_ping()
        .times(1)
        .returning(|| Err(StoreError::Pool("down".to_string())));

    let (status, body) = sensor_api::health::handler(test_state(store)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.0.status, sensor_api::health::HealthStatus::Unhealthy);
}
