use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::{TrackError, TrackPoint};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Elevation,
    Time,
    HeartRate,
}

#[derive(Debug, Default)]
struct PendingPoint {
    lat: f64,
    lon: f64,
    ele: Option<f64>,
    time: Option<DateTime<Utc>>,
    hr: Option<f64>,
}

impl PendingPoint {
    fn from_start(e: &BytesStart) -> Result<Self, TrackError> {
        Ok(Self {
            lat: coordinate_attr(e, "lat")?,
            lon: coordinate_attr(e, "lon")?,
            ..Self::default()
        })
    }

    fn assign(&mut self, field: Field, text: &str) -> Result<(), TrackError> {
        match field {
            Field::Elevation => self.ele = Some(parse_number(text, "ele")?),
            Field::HeartRate => self.hr = Some(parse_number(text, "hr")?),
            Field::Time => self.time = Some(parse_time(text)?),
        }
        Ok(())
    }

    fn finish(self) -> Option<TrackPoint> {
        Some(TrackPoint {
            timestamp: self.time?,
            longitude: self.lon,
            latitude: self.lat,
            elevation: self.ele.unwrap_or(0.0),
            heart_rate: self.hr,
        })
    }
}

/// Streams `trkpt` elements of every track and segment in document order.
/// Heart rate comes from any extension element named `hr`, whatever its
/// namespace prefix.
pub(crate) fn parse_gpx(input: &[u8]) -> Result<Vec<TrackPoint>, TrackError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut points = Vec::new();
    let mut current: Option<PendingPoint> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut untimed = 0usize;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            TrackError::GpxParse(format!("error at position {}: {}", reader.buffer_position(), e))
        })?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"trkpt" => current = Some(PendingPoint::from_start(e)?),
                name if current.is_some() => {
                    field = match name {
                        b"ele" => Some(Field::Elevation),
                        b"time" => Some(Field::Time),
                        b"hr" => Some(Field::HeartRate),
                        _ => None,
                    };
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"trkpt" => {
                PendingPoint::from_start(e)?;
                untimed += 1;
            }
            Event::Text(ref e) if field.is_some() => {
                let chunk = e
                    .unescape()
                    .map_err(|err| TrackError::GpxParse(err.to_string()))?;
                text.push_str(&chunk);
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    if let Some(pending) = current.take() {
                        match pending.finish() {
                            Some(point) => points.push(point),
                            None => untimed += 1,
                        }
                    }
                } else if let (Some(f), Some(pending)) = (field.take(), current.as_mut()) {
                    pending.assign(f, text.trim())?;
                }
            }
            _ => {}
        }
    }

    if untimed > 0 {
        debug!("skipped {} GPX track points without a timestamp", untimed);
    }
    Ok(points)
}

fn coordinate_attr(e: &BytesStart, name: &str) -> Result<f64, TrackError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| TrackError::GpxParse(err.to_string()))?
        .ok_or_else(|| TrackError::GpxParse(format!("trkpt missing '{}' attribute", name)))?;
    let value = attr
        .unescape_value()
        .map_err(|err| TrackError::GpxParse(err.to_string()))?;
    parse_number(&value, name)
}

fn parse_number(text: &str, what: &str) -> Result<f64, TrackError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| TrackError::GpxParse(format!("invalid {} value '{}'", what, text)))
}

fn parse_time(text: &str) -> Result<DateTime<Utc>, TrackError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| TrackError::GpxParse(format!("invalid time '{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_track;

    const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1"
     xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  <metadata><time>2019-01-01T00:00:00Z</time></metadata>
  <trk>
    <name>Morning Run</name>
    <trkseg>
      <trkpt lat="38.90" lon="-77.00">
        <ele>10.5</ele>
        <time>2020-09-13T12:26:40Z</time>
        <extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>60</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions>
      </trkpt>
      <trkpt lat="38.91" lon="-77.01">
        <ele>25</ele>
        <time>2020-09-13T12:26:50Z</time>
        <extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>120</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions>
      </trkpt>
      <trkpt lat="38.915" lon="-77.015"><ele>30</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="38.92" lon="-77.02">
        <time>2020-09-13T12:27:00.500</time>
      </trkpt>
      <trkpt lat="38.93" lon="-77.03"/>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn reads_points_with_heart_rate() {
        let points = parse_gpx(SAMPLE_GPX.as_bytes()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].latitude, 38.90);
        assert_eq!(points[0].longitude, -77.00);
        assert_eq!(points[0].elevation, 10.5);
        assert_eq!(points[0].heart_rate, Some(60.0));
        assert_eq!(points[1].heart_rate, Some(120.0));
        assert_eq!(points[2].heart_rate, None);
        assert_eq!(points[2].elevation, 0.0);
        assert_eq!(
            (points[2].timestamp - points[0].timestamp).num_milliseconds(),
            20_500
        );
    }

    #[test]
    fn parse_track_builds_an_ordered_track() {
        let track = parse_track(SAMPLE_GPX.as_bytes(), "run.GPX").unwrap();
        assert_eq!(track.len(), 3);
        assert_eq!(track.heart_rate_extent(), Some((60.0, 120.0)));
    }

    #[test]
    fn out_of_order_points_are_sorted_by_the_loader() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="1" lon="1"><time>2020-01-01T00:00:10Z</time></trkpt>
            <trkpt lat="2" lon="2"><time>2020-01-01T00:00:00Z</time></trkpt>
        </trkseg></trk></gpx>"#;
        let track = parse_track(gpx.as_bytes(), "gpx").unwrap();
        assert_eq!(track.points()[0].latitude, 2.0);
    }

    #[test]
    fn track_without_timestamps_is_invalid() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="1" lon="1"/></trkseg></trk></gpx>"#;
        assert!(matches!(
            parse_track(gpx.as_bytes(), "gpx"),
            Err(TrackError::InvalidInput(_))
        ));
    }

    #[test]
    fn malformed_values_are_parse_errors() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="north" lon="1"/></trkseg></trk></gpx>"#;
        assert!(matches!(parse_gpx(gpx.as_bytes()), Err(TrackError::GpxParse(_))));
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="1" lon="1"><time>yesterday</time></trkpt></trkseg></trk></gpx>"#;
        assert!(matches!(parse_gpx(gpx.as_bytes()), Err(TrackError::GpxParse(_))));
    }
}
