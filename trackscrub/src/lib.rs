//! Time-synchronized track viewer core.
//!
//! Loads a GPS track (GPX or FIT), projects it onto ordered time series and
//! binds a single scrubbed cursor time to the dependent views: a map marker,
//! a chart label and a chart connector.

pub mod binder;
pub mod chart;
pub mod config;
mod fit;
pub mod format;
pub mod geojson;
mod gpx;
pub mod map;
pub mod scale;
pub mod segment;
pub mod series;
pub mod session;
pub mod slider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use binder::CursorBinder;
pub use chart::{ChartPrimitive, ChartScene, ChartSurface, PrimitiveId};
pub use config::ViewConfig;
pub use format::{elapsed_label, parse_cursor_token, ValueLabel};
pub use map::{LayerId, LayerStyle, MapLayer, MapScene, MapSurface, MarkerStyle};
pub use scale::{ColorScale, LinearScale, Rgb, TimeDomain, TimeScale};
pub use segment::{segments, Segment, SegmentEnd};
pub use series::{RangePolicy, Sample, TimeSeries};
pub use session::{ScrubReport, Session};
pub use slider::{Margin, Slider};

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cursor {query} outside series range [{start}, {end}]")]
    OutOfRange {
        query: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to parse GPX file: {0}")]
    GpxParse(String),
    #[error("failed to parse FIT file: {0}")]
    FitParse(String),
    #[error("invalid view configuration: {0}")]
    Config(String),
}

/// Geographic position in degrees, longitude first as in GeoJSON.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Great-circle distance in meters (spherical earth).
    pub fn distance_m(&self, other: &LonLat) -> f64 {
        let (phi1, phi2) = (self.lat.to_radians(), other.lat.to_radians());
        let half_dphi = (phi2 - phi1) / 2.0;
        let half_dlambda = (other.lon - self.lon).to_radians() / 2.0;
        let h = half_dphi.sin().powi(2) + phi1.cos() * phi2.cos() * half_dlambda.sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LonLat,
    pub north_east: LonLat,
}

impl Bounds {
    fn around(position: LonLat) -> Self {
        Self {
            south_west: position,
            north_east: position,
        }
    }

    fn extend(&mut self, position: LonLat) {
        self.south_west.lon = self.south_west.lon.min(position.lon);
        self.south_west.lat = self.south_west.lat.min(position.lat);
        self.north_east.lon = self.north_east.lon.max(position.lon);
        self.north_east.lat = self.north_east.lat.max(position.lat);
    }
}

/// One GPS fix as read from the source file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: f64,
    pub heart_rate: Option<f64>,
}

impl TrackPoint {
    pub fn position(&self) -> LonLat {
        LonLat::new(self.longitude, self.latitude)
    }

    pub fn sample(&self) -> TrackSample {
        TrackSample {
            position: self.position(),
            elevation: self.elevation,
            heart_rate: self.heart_rate,
        }
    }
}

/// Per-sample payload driving every view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    pub position: LonLat,
    pub elevation: f64,
    pub heart_rate: Option<f64>,
}

/// A non-empty track ordered by timestamp.
#[derive(Clone, Debug)]
pub struct Track {
    points: Vec<TrackPoint>,
}

impl Track {
    /// Wraps loader output. The points must already be sorted; this only
    /// checks the ordering and rejects empty input.
    pub fn new(points: Vec<TrackPoint>) -> Result<Self, TrackError> {
        if points.is_empty() {
            return Err(TrackError::InvalidInput(
                "track contains no timestamped points".into(),
            ));
        }
        if let Some(pos) = points
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(TrackError::InvalidInput(format!(
                "track point {} at {} precedes point {} at {}",
                pos + 1,
                points[pos + 1].timestamp.to_rfc3339(),
                pos,
                points[pos].timestamp.to_rfc3339()
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn time_domain(&self) -> TimeDomain {
        TimeDomain::new(self.points[0].timestamp, self.points[self.len() - 1].timestamp)
    }

    /// The primary series: one named-field sample per track point.
    pub fn samples(&self) -> TimeSeries<TrackSample> {
        TimeSeries::from_sorted(self.points.iter().map(|p| (p.timestamp, p.sample())))
    }

    pub fn position_series(&self) -> TimeSeries<LonLat> {
        self.samples().map(|s| s.position)
    }

    pub fn heart_rate_series(&self) -> TimeSeries<Option<f64>> {
        self.samples().map(|s| s.heart_rate)
    }

    pub fn elevation_series(&self) -> TimeSeries<f64> {
        self.samples().map(|s| s.elevation)
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::around(self.points[0].position());
        for point in &self.points[1..] {
            bounds.extend(point.position());
        }
        bounds
    }

    pub fn max_elevation(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.elevation)
            .fold(f64::MIN, f64::max)
    }

    /// `(min, max)` over the points that carry a heart rate.
    pub fn heart_rate_extent(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.heart_rate)
            .fold(None, |acc, hr| match acc {
                None => Some((hr, hr)),
                Some((lo, hi)) => Some((lo.min(hr), hi.max(hr))),
            })
    }

    /// Cumulative great-circle distance in meters at every point.
    pub fn distances_m(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.points.len());
        let mut total = 0.0;
        out.push(total);
        for w in self.points.windows(2) {
            total += w[0].position().distance_m(&w[1].position());
            out.push(total);
        }
        out
    }
}

/// Parse a GPX or FIT track from bytes using the provided format hint (extension).
///
/// Points are returned sorted by timestamp; equal timestamps keep file order.
pub fn parse_track(input: &[u8], format: &str) -> Result<Track, TrackError> {
    let format_lc = format.to_ascii_lowercase();
    let mut points = if format_lc.ends_with(".gpx") || format_lc == "gpx" {
        gpx::parse_gpx(input)?
    } else if format_lc.ends_with(".fit") || format_lc == "fit" {
        fit::parse_fit(input)?
    } else {
        return Err(TrackError::UnsupportedFormat(format.to_string()));
    };

    if points.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
        debug!("reordering {} track points by timestamp", points.len());
        points.sort_by_key(|p| p.timestamp);
    }
    Track::new(points)
}
