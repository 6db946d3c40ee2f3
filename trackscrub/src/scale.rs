//! Linear, time and color scales shared by the slider and the charts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDomain {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeDomain {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    pub fn clamp(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        t.max(self.start).min(self.end)
    }
}

/// Maps `domain` onto `range` linearly. Neither end is clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        r0 + normalize(value, d0, d1) * (r1 - r0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        d0 + normalize(pixel, r0, r1) * (d1 - d0)
    }
}

// A collapsed interval maps everything to its lower end.
fn normalize(value: f64, lo: f64, hi: f64) -> f64 {
    let width = hi - lo;
    if width.abs() < f64::EPSILON {
        0.0
    } else {
        (value - lo) / width
    }
}

/// Linear scale from instants to pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeScale {
    domain: TimeDomain,
    linear: LinearScale,
}

impl TimeScale {
    pub fn new(domain: TimeDomain, range: (f64, f64)) -> Self {
        let span_ms = domain.span().num_milliseconds() as f64;
        Self {
            domain,
            linear: LinearScale::new((0.0, span_ms), range),
        }
    }

    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.linear.range()
    }

    pub fn apply(&self, t: DateTime<Utc>) -> f64 {
        let offset_ms = (t - self.domain.start).num_milliseconds() as f64;
        self.linear.apply(offset_ms)
    }

    pub fn invert(&self, pixel: f64) -> DateTime<Utc> {
        let offset_ms = self.linear.invert(pixel).round() as i64;
        self.domain.start + Duration::milliseconds(offset_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Accepts a handful of CSS color names and `#rgb` / `#rrggbb` hex.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if let Some(hex) = spec.strip_prefix('#') {
            return parse_hex(hex);
        }
        let rgb = match spec.to_ascii_lowercase().as_str() {
            "black" => Rgb::new(0, 0, 0),
            "white" => Rgb::new(255, 255, 255),
            "red" => Rgb::new(255, 0, 0),
            "darkred" => Rgb::new(139, 0, 0),
            "green" => Rgb::new(0, 128, 0),
            "blue" => Rgb::new(0, 0, 255),
            "navy" => Rgb::new(0, 0, 128),
            "orange" => Rgb::new(255, 165, 0),
            "yellow" => Rgb::new(255, 255, 0),
            "purple" => Rgb::new(128, 0, 128),
            "steelblue" => Rgb::new(70, 130, 180),
            "gray" | "grey" => Rgb::new(128, 128, 128),
            _ => return None,
        };
        Some(rgb)
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(&self, other: &Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    match digits.as_slice() {
        [r, g, b] => Some(Rgb::new(r * 17, g * 17, b * 17)),
        [r1, r0, g1, g0, b1, b0] => Some(Rgb::new(r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0)),
        _ => None,
    }
}

/// Interpolates between two colors over a numeric domain, clamped at both
/// ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    domain: (f64, f64),
    low: Rgb,
    high: Rgb,
}

impl ColorScale {
    pub fn new(domain: (f64, f64), low: Rgb, high: Rgb) -> Self {
        Self { domain, low, high }
    }

    pub fn apply(&self, value: f64) -> Rgb {
        let t = normalize(value, self.domain.0, self.domain.1).clamp(0.0, 1.0);
        self.low.lerp(&self.high, t)
    }

    pub fn low(&self) -> Rgb {
        self.low
    }
}
