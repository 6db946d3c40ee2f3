//! Splits a track into two-point segments carrying before/after values, so
//! each piece of the route can be styled on its own.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::map::LayerStyle;
use crate::scale::ColorScale;
use crate::{LonLat, Track, TrackPoint};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SegmentEnd {
    pub timestamp: DateTime<Utc>,
    pub position: LonLat,
    pub elevation: f64,
    pub heart_rate: Option<f64>,
}

impl From<&TrackPoint> for SegmentEnd {
    fn from(point: &TrackPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            position: point.position(),
            elevation: point.elevation,
            heart_rate: point.heart_rate,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub start: SegmentEnd,
    pub end: SegmentEnd,
}

impl Segment {
    /// Width follows the starting elevation, color the starting heart rate.
    /// A missing reading takes the low end of the ramp.
    pub fn style(&self, colors: &ColorScale, weight_divisor: f64) -> LayerStyle {
        LayerStyle {
            weight: self.start.elevation / weight_divisor,
            color: self
                .start
                .heart_rate
                .map(|hr| colors.apply(hr))
                .unwrap_or_else(|| colors.low()),
            opacity: 1.0,
        }
    }
}

pub fn segments(track: &Track) -> Vec<Segment> {
    track
        .points()
        .windows(2)
        .map(|w| Segment {
            start: SegmentEnd::from(&w[0]),
            end: SegmentEnd::from(&w[1]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Rgb;
    use crate::tests::{point, three_point_track};

    #[test]
    fn consecutive_pairs_become_segments() {
        let track = three_point_track();
        let segs = segments(&track);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start.heart_rate, Some(60.0));
        assert_eq!(segs[0].end.heart_rate, Some(120.0));
        assert_eq!(segs[1].start.timestamp, track.points()[1].timestamp);
        assert_eq!(segs[1].end.position, track.points()[2].position());
    }

    #[test]
    fn single_point_track_has_no_segments() {
        let track = Track::new(vec![point(0, 1.0, 2.0, 3.0, None)]).unwrap();
        assert!(segments(&track).is_empty());
    }

    #[test]
    fn style_uses_start_values() {
        let colors = ColorScale::new((60.0, 180.0), Rgb::new(255, 0, 0), Rgb::new(255, 255, 255));
        let segs = segments(&three_point_track());
        let first = segs[0].style(&colors, 7.0);
        assert_eq!(first.weight, 10.0 / 7.0);
        assert_eq!(first.color, Rgb::new(255, 0, 0));
        let second = segs[1].style(&colors, 5.0);
        assert_eq!(second.weight, 5.0);
        assert_eq!(second.color, Rgb::new(255, 128, 128));

        let track = Track::new(vec![
            point(0, 0.0, 0.0, 14.0, None),
            point(1, 0.0, 0.0, 14.0, None),
        ])
        .unwrap();
        let bare = segments(&track)[0].style(&colors, 7.0);
        assert_eq!(bare.color, colors.low());
    }
}
