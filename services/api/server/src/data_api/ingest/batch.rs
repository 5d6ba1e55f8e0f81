use chrono::DateTime;
use postgres_models::models::sensor_readings::NewSensorReading;

/// A reading line that failed validation. Messages name the line and the
/// offending field so callers can fix their payload.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LineError {
    #[error(
        "Malformed data at line {line}: expected `<timestamp> <metric> <value>`"
    )]
    MalformedLine { line: usize },

    #[error("Invalid metric name at line {line}: {name}")]
    UnknownMetric { line: usize, name: String },

    #[error("Invalid value data format at line {line}: {value}")]
    InvalidValue { line: usize, value: String },

    #[error("Invalid timestamp date at line {line}: {timestamp}")]
    InvalidTimestamp { line: usize, timestamp: String },
}

impl LineError {
    pub fn code(&self) -> &'static str {
        match self {
            LineError::MalformedLine { .. } => "malformed_line",
            LineError::UnknownMetric { .. } => "unknown_metric",
            LineError::InvalidValue { .. } => "invalid_value",
            LineError::InvalidTimestamp { .. } => "invalid_timestamp",
        }
    }
}

/// Parses newline-delimited `<timestamp> <metric_name> <value>` batches.
///
/// The metric allow-list is injected at construction so deployments (and
/// tests) can change it without touching a global.
#[derive(Debug, Clone)]
pub struct BatchValidator {
    allowed_metrics: Vec<String>,
}

impl BatchValidator {
    pub fn new(allowed_metrics: Vec<String>) -> Self {
        Self { allowed_metrics }
    }

    /// Validate every line before reporting success. The first failing line
    /// rejects the whole batch; nothing is handed to storage.
    pub fn parse_batch(
        &self,
        raw: &str,
    ) -> Result<Vec<NewSensorReading>, LineError> {
        let mut readings = Vec::new();

        for (idx, line) in raw.lines().enumerate() {
            readings.push(self.parse_line(idx + 1, line)?);
        }

        Ok(readings)
    }

    fn parse_line(
        &self,
        line_no: usize,
        line: &str,
    ) -> Result<NewSensorReading, LineError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(LineError::MalformedLine { line: line_no });
        }

        let (timestamp_str, name, value_str) =
            (tokens[0], tokens[1], tokens[2]);

        if !self.allowed_metrics.iter().any(|m| m == name) {
            return Err(LineError::UnknownMetric {
                line: line_no,
                name: name.to_string(),
            });
        }

        let metric_value: f64 =
            value_str.parse().map_err(|_| LineError::InvalidValue {
                line: line_no,
                value: value_str.to_string(),
            })?;
        if !metric_value.is_finite() {
            return Err(LineError::InvalidValue {
                line: line_no,
                value: value_str.to_string(),
            });
        }

        // Epoch seconds; the timestamp must land on a representable UTC date.
        let recorded_at: i64 = timestamp_str.parse().map_err(|_| {
            LineError::InvalidTimestamp {
                line: line_no,
                timestamp: timestamp_str.to_string(),
            }
        })?;
        if DateTime::from_timestamp(recorded_at, 0).is_none() {
            return Err(LineError::InvalidTimestamp {
                line: line_no,
                timestamp: timestamp_str.to_string(),
            });
        }

        Ok(NewSensorReading {
            recorded_at,
            metric_name: name.to_string(),
            metric_value,
        })
    }
}
