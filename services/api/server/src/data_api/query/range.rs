use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RangeError {
    #[error("from and to query parameters are required")]
    MissingParameter,

    #[error("Invalid date format")]
    InvalidBound,
}

impl RangeError {
    pub fn code(&self) -> &'static str {
        match self {
            RangeError::MissingParameter => "missing_range_parameter",
            RangeError::InvalidBound => "invalid_range",
        }
    }
}

/// Parse both inclusive range bounds into epoch seconds.
pub fn parse_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(i64, i64), RangeError> {
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(RangeError::MissingParameter),
    };

    Ok((parse_bound(from)?, parse_bound(to)?))
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC assumed) and bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_bound(raw: &str) -> Result<i64, RangeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(ndt.and_utc().timestamp());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp());
    }

    Err(RangeError::InvalidBound)
}
