//! Model of the time slider widget: domain, pixel width, margins and the
//! current cursor value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::elapsed_label;
use crate::scale::{TimeDomain, TimeScale};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 0.0,
            left: 20.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Slider {
    domain: TimeDomain,
    width: f64,
    margin: Margin,
    value: DateTime<Utc>,
}

impl Slider {
    pub fn new(domain: TimeDomain, width: f64, margin: Margin) -> Self {
        Self {
            domain,
            width,
            margin,
            value: domain.start,
        }
    }

    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn margin(&self) -> Margin {
        self.margin
    }

    pub fn value(&self) -> DateTime<Utc> {
        self.value
    }

    pub fn scale(&self) -> TimeScale {
        TimeScale::new(self.domain, (0.0, self.width))
    }

    /// Moves the handle, keeping it inside the domain. Returns the stored value.
    pub fn set_value(&mut self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.value = self.domain.clamp(t);
        self.value
    }

    /// Instant under a pixel offset along the track.
    pub fn time_at(&self, pixel: f64) -> DateTime<Utc> {
        self.scale().invert(pixel.clamp(0.0, self.width))
    }

    pub fn label(&self, t: DateTime<Utc>) -> String {
        elapsed_label(self.domain.start, t)
    }
}
