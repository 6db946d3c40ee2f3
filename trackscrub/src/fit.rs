use chrono::{DateTime, Utc};
use fitparser::de::from_bytes;
use fitparser::profile::MesgNum;
use fitparser::Value;
use tracing::debug;

use crate::{TrackError, TrackPoint};

const SEMICIRCLES_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Reads `record` messages that carry both a timestamp and a position.
pub(crate) fn parse_fit(input: &[u8]) -> Result<Vec<TrackPoint>, TrackError> {
    let records = from_bytes(input).map_err(|e| TrackError::FitParse(e.to_string()))?;
    let mut out = Vec::new();
    let mut skipped = 0usize;

    for record in records.into_iter() {
        if record.kind() != MesgNum::Record {
            continue;
        }
        let mut timestamp: Option<DateTime<Utc>> = None;
        let mut lat: Option<f64> = None;
        let mut lon: Option<f64> = None;
        let mut elevation: Option<f64> = None;
        let mut heart_rate: Option<f64> = None;
        for field in record.fields() {
            match field.name() {
                "timestamp" => {
                    if let Value::Timestamp(ts) = field.value() {
                        timestamp = Some(ts.with_timezone(&Utc));
                    }
                }
                "position_lat" => lat = fit_value_to_f64(field.value()).map(semicircles),
                "position_long" => lon = fit_value_to_f64(field.value()).map(semicircles),
                "enhanced_altitude" => elevation = fit_value_to_f64(field.value()),
                "altitude" => {
                    if elevation.is_none() {
                        elevation = fit_value_to_f64(field.value());
                    }
                }
                "heart_rate" => heart_rate = fit_value_to_f64(field.value()),
                _ => {}
            }
        }
        match (timestamp, lat, lon) {
            (Some(timestamp), Some(latitude), Some(longitude)) => out.push(TrackPoint {
                timestamp,
                longitude,
                latitude,
                elevation: elevation.unwrap_or(0.0),
                heart_rate,
            }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("skipped {} FIT records without timestamp or position", skipped);
    }
    Ok(out)
}

fn semicircles(value: f64) -> f64 {
    value * SEMICIRCLES_TO_DEGREES
}

/// Numeric record fields arrive as scaled floats (altitude), signed
/// semicircles (position) or small unsigned ints (heart rate).
fn fit_value_to_f64(value: &Value) -> Option<f64> {
    match *value {
        Value::Float64(v) => Some(v),
        Value::Float32(v) => Some(f64::from(v)),
        Value::SInt32(v) => Some(f64::from(v)),
        Value::UInt32(v) => Some(f64::from(v)),
        Value::UInt16(v) => Some(f64::from(v)),
        Value::UInt8(v) => Some(f64::from(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicircles_convert_to_degrees() {
        assert_eq!(semicircles(0.0), 0.0);
        assert!((semicircles(1_073_741_824.0) - 90.0).abs() < 1e-12);
        assert!((semicircles(-536_870_912.0) + 45.0).abs() < 1e-12);
    }

    #[test]
    fn numeric_values_widen() {
        assert_eq!(fit_value_to_f64(&Value::UInt8(142)), Some(142.0));
        assert_eq!(fit_value_to_f64(&Value::SInt32(-536_870_912)), Some(-536_870_912.0));
        assert_eq!(fit_value_to_f64(&Value::Float64(812.4)), Some(812.4));
        assert_eq!(fit_value_to_f64(&Value::String("x".into())), None);
    }

    #[test]
    fn garbage_is_a_fit_error() {
        assert!(matches!(parse_fit(b"not a fit file"), Err(TrackError::FitParse(_))));
    }
}
