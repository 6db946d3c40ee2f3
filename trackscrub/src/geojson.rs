//! GeoJSON export of the track and its styled segments.

use chrono::{DateTime, SecondsFormat, Utc};
use ::geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::scale::ColorScale;
use crate::segment::{segments, SegmentEnd};
use crate::{Track, TrackPoint};

fn coord_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn line_feature(coordinates: Vec<Vec<f64>>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coordinates))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn point_position(p: &TrackPoint) -> Vec<f64> {
    vec![p.longitude, p.latitude, p.elevation]
}

fn end_position(end: &SegmentEnd) -> Vec<f64> {
    vec![end.position.lon, end.position.lat, end.elevation]
}

/// The whole track as one `LineString` feature with per-vertex
/// `coordTimes` and `heartRates` properties.
pub fn track_feature(track: &Track) -> FeatureCollection {
    let points = track.points();
    let times: Vec<String> = points.iter().map(|p| coord_time(p.timestamp)).collect();
    let heart_rates: Vec<Option<f64>> = points.iter().map(|p| p.heart_rate).collect();

    let mut properties = JsonObject::new();
    properties.insert("coordTimes".to_string(), json!(times));
    if heart_rates.iter().any(Option::is_some) {
        properties.insert("heartRates".to_string(), json!(heart_rates));
    }

    let coordinates = points.iter().map(point_position).collect();
    collection(vec![line_feature(coordinates, properties)])
}

/// One two-point feature per segment, with `stroke`/`stroke-width` taken
/// from the segment style.
pub fn segment_collection(track: &Track, colors: &ColorScale, weight_divisor: f64) -> FeatureCollection {
    let features = segments(track)
        .iter()
        .map(|seg| {
            let style = seg.style(colors, weight_divisor);
            let mut properties = JsonObject::new();
            properties.insert(
                "coordTimes".to_string(),
                json!([coord_time(seg.start.timestamp), coord_time(seg.end.timestamp)]),
            );
            properties.insert(
                "heartRates".to_string(),
                json!([seg.start.heart_rate, seg.end.heart_rate]),
            );
            properties.insert("stroke".to_string(), json!(style.color.to_hex()));
            properties.insert("stroke-width".to_string(), json!(style.weight));
            properties.insert("stroke-opacity".to_string(), json!(style.opacity));
            line_feature(vec![end_position(&seg.start), end_position(&seg.end)], properties)
        })
        .collect();
    collection(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Rgb;
    use crate::tests::{point, three_point_track};

    #[test]
    fn track_feature_carries_times_and_heart_rates() {
        let fc = track_feature(&three_point_track());
        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::LineString(coords)) => {
                assert_eq!(coords.len(), 3);
                assert_eq!(coords[1], vec![-77.01, 38.91, 25.0]);
            }
            other => panic!("expected a line string, got {:?}", other),
        }
        assert_eq!(
            feature.property("heartRates"),
            Some(&json!([60.0, 120.0, 180.0]))
        );
        assert_eq!(
            feature.property("coordTimes").and_then(|t| t.get(0)),
            Some(&json!("2020-09-13T12:26:40.000Z"))
        );
    }

    #[test]
    fn heart_rates_omitted_without_readings() {
        let track = Track::new(vec![point(0, 0.0, 0.0, 0.0, None)]).unwrap();
        let fc = track_feature(&track);
        assert!(!fc.features[0].contains_property("heartRates"));
    }

    #[test]
    fn serializes_as_a_feature_collection() {
        let value = serde_json::to_value(track_feature(&three_point_track())).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"][2],
            json!([-77.02, 38.92, 40.0])
        );
    }

    #[test]
    fn segments_are_styled() {
        let colors = ColorScale::new((60.0, 180.0), Rgb::new(255, 0, 0), Rgb::new(255, 255, 255));
        let fc = segment_collection(&three_point_track(), &colors, 5.0);
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].property("stroke"), Some(&json!("#ff0000")));
        assert_eq!(fc.features[0].property("stroke-width"), Some(&json!(2.0)));
        assert_eq!(
            fc.features[1].property("heartRates"),
            Some(&json!([120.0, 180.0]))
        );
    }
}
