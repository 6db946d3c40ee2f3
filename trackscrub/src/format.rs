//! Label formatting and cursor token parsing.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::TrackError;

/// Time elapsed since `start` as `MM:SS`, or `H:MM:SS` past the hour.
pub fn elapsed_label(start: DateTime<Utc>, t: DateTime<Utc>) -> String {
    let secs = (t - start).num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Fixed-decimal value label such as `120 bpm`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLabel {
    pub unit: String,
    pub decimals: usize,
}

impl ValueLabel {
    pub fn new(unit: impl Into<String>, decimals: usize) -> Self {
        Self {
            unit: unit.into(),
            decimals,
        }
    }

    pub fn format(&self, value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => format!("{:.*} {}", self.decimals, v, self.unit),
            _ => format!("-- {}", self.unit),
        }
    }
}

/// Parse a cursor position relative to `start`.
///
/// Accepts plain seconds (`95`, `95.5`, `95s`), clock offsets (`1:35`,
/// `1:01:35`) or an absolute RFC 3339 instant.
pub fn parse_cursor_token(token: &str, start: DateTime<Utc>) -> Result<DateTime<Utc>, TrackError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(TrackError::InvalidInput("empty cursor token".into()));
    }
    let invalid = || TrackError::InvalidInput(format!("invalid cursor token '{}'", trimmed));

    if trimmed.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }
        return NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| invalid());
    }

    let seconds = if trimmed.contains(':') {
        let mut total = 0.0;
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }
        for part in parts {
            let value: f64 = part.parse().map_err(|_| invalid())?;
            total = total * 60.0 + value;
        }
        total
    } else {
        trimmed
            .strip_suffix('s')
            .unwrap_or(trimmed)
            .parse::<f64>()
            .map_err(|_| invalid())?
    };
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid());
    }
    let millis = (seconds * 1000.0).round();
    if millis >= i64::MAX as f64 {
        return Err(invalid());
    }
    TimeDelta::try_milliseconds(millis as i64)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or_else(|| TrackError::InvalidInput(format!("cursor token '{}' is out of range", trimmed)))
}
