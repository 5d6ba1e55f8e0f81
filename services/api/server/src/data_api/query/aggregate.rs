use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use postgres_models::models::sensor_readings::SensorReading;

use super::models::MetricPoint;

pub const POWER_METRIC: &str = "Power";
const VOLTAGE_METRIC: &str = "Voltage";
const CURRENT_METRIC: &str = "Current";

/// Group readings by UTC calendar day and append one synthetic Power point
/// per day: `avg(Voltage) * avg(Current)`, where an absent metric averages
/// to zero.
///
/// Storage order is not trusted: days are emitted oldest first, and readings
/// within a day oldest first.
pub fn daily_series(readings: Vec<SensorReading>) -> Vec<MetricPoint> {
    let mut days: BTreeMap<NaiveDate, Vec<(DateTime<Utc>, SensorReading)>> =
        BTreeMap::new();

    for reading in readings {
        let Some(ts) = DateTime::from_timestamp(reading.recorded_at, 0) else {
            // Validated at ingestion; only out-of-band rows can get here.
            tracing::warn!(
                recorded_at = reading.recorded_at,
                "Skipping reading with unrepresentable timestamp"
            );
            continue;
        };
        days.entry(ts.date_naive()).or_default().push((ts, reading));
    }

    let mut series = Vec::new();
    for (day, mut day_readings) in days {
        day_readings.sort_by_key(|(ts, _)| *ts);

        let avg_voltage = average(&day_readings, VOLTAGE_METRIC);
        let avg_current = average(&day_readings, CURRENT_METRIC);

        for (ts, reading) in &day_readings {
            series.push(MetricPoint {
                time: iso_millis(*ts),
                name: reading.metric_name.clone(),
                value: reading.metric_value,
            });
        }

        series.push(MetricPoint {
            time: iso_millis(day.and_time(NaiveTime::MIN).and_utc()),
            name: POWER_METRIC.to_string(),
            value: avg_voltage * avg_current,
        });
    }

    series
}

fn average(
    day_readings: &[(DateTime<Utc>, SensorReading)],
    metric: &str,
) -> f64 {
    let values: Vec<f64> = day_readings
        .iter()
        .filter(|(_, r)| r.metric_name == metric)
        .map(|(_, r)| r.metric_value)
        .collect();

    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// `2023-11-14T22:13:20.000Z` - fixed millisecond precision.
fn iso_millis(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
