//! Chart surface seam and the recorded scene used for static rendering.
//!
//! Coordinates are chart-local pixels: `x` runs along the slider width and
//! `y` grows downwards from the top of the plot area.

use serde::Serialize;

use crate::scale::{LinearScale, TimeScale};
use crate::series::TimeSeries;
use crate::slider::Margin;
use crate::TrackSample;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PrimitiveId(pub usize);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ChartPrimitive {
    /// Polyline broken into runs wherever data is missing.
    Path {
        class: String,
        runs: Vec<Vec<(f64, f64)>>,
    },
    /// Filled region between `baseline` and the points.
    Area {
        class: String,
        baseline: f64,
        points: Vec<(f64, f64)>,
    },
    /// Text centered horizontally on `x`, baseline at `y`.
    Text {
        class: String,
        x: f64,
        y: f64,
        text: String,
    },
    Rect {
        class: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl ChartPrimitive {
    pub fn class(&self) -> &str {
        match self {
            ChartPrimitive::Path { class, .. }
            | ChartPrimitive::Area { class, .. }
            | ChartPrimitive::Text { class, .. }
            | ChartPrimitive::Rect { class, .. } => class,
        }
    }
}

pub trait ChartSurface {
    fn append(&mut self, primitive: ChartPrimitive) -> PrimitiveId;
    fn update(&mut self, id: PrimitiveId, primitive: ChartPrimitive);
}

#[derive(Clone, Debug, Serialize)]
pub struct ChartScene {
    width: f64,
    height: f64,
    margin: Margin,
    primitives: Vec<ChartPrimitive>,
}

impl ChartScene {
    pub fn new(width: f64, height: f64, margin: Margin) -> Self {
        Self {
            width,
            height,
            margin,
            primitives: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn margin(&self) -> Margin {
        self.margin
    }

    /// Outer size including margins, as the SVG element would be sized.
    pub fn outer_size(&self) -> (f64, f64) {
        (
            self.width + self.margin.left + self.margin.right,
            self.height + self.margin.top + self.margin.bottom,
        )
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&ChartPrimitive> {
        self.primitives.get(id.0)
    }

    pub fn primitives(&self) -> &[ChartPrimitive] {
        &self.primitives
    }

    pub fn find(&self, class: &str) -> Option<&ChartPrimitive> {
        self.primitives.iter().find(|p| p.class() == class)
    }
}

/// Heart-rate line; samples without a reading split the line.
pub fn heart_line(
    samples: &TimeSeries<TrackSample>,
    x: &TimeScale,
    y: &LinearScale,
) -> ChartPrimitive {
    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current = Vec::new();
    for sample in samples {
        match sample.value.heart_rate {
            Some(hr) => current.push((x.apply(sample.timestamp), y.apply(hr))),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    ChartPrimitive::Path {
        class: "heart-line".to_string(),
        runs,
    }
}

/// Elevation area filled down to the bottom of the plot.
pub fn elevation_area(
    samples: &TimeSeries<TrackSample>,
    x: &TimeScale,
    y: &LinearScale,
    height: f64,
) -> ChartPrimitive {
    ChartPrimitive::Area {
        class: "elevation-area".to_string(),
        baseline: height,
        points: samples
            .iter()
            .map(|s| (x.apply(s.timestamp), y.apply(s.value.elevation)))
            .collect(),
    }
}

impl ChartSurface for ChartScene {
    fn append(&mut self, primitive: ChartPrimitive) -> PrimitiveId {
        self.primitives.push(primitive);
        PrimitiveId(self.primitives.len() - 1)
    }

    fn update(&mut self, id: PrimitiveId, primitive: ChartPrimitive) {
        if let Some(slot) = self.primitives.get_mut(id.0) {
            *slot = primitive;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{point, three_point_track};
    use crate::Track;

    #[test]
    fn heart_line_breaks_on_missing_readings() {
        let track = Track::new(vec![
            point(0, 0.0, 0.0, 0.0, Some(100.0)),
            point(10, 0.0, 0.0, 0.0, None),
            point(20, 0.0, 0.0, 0.0, Some(150.0)),
            point(40, 0.0, 0.0, 0.0, Some(200.0)),
        ])
        .unwrap();
        let samples = track.samples();
        let x = TimeScale::new(samples.domain(), (0.0, 400.0));
        let y = LinearScale::new((0.0, 200.0), (80.0, 0.0));
        match heart_line(&samples, &x, &y) {
            ChartPrimitive::Path { runs, .. } => {
                assert_eq!(runs.len(), 2);
                assert_eq!(runs[0], vec![(0.0, 40.0)]);
                assert_eq!(runs[1], vec![(200.0, 20.0), (400.0, 0.0)]);
            }
            other => panic!("unexpected primitive {:?}", other),
        }
    }

    #[test]
    fn elevation_area_sits_on_the_baseline() {
        let samples = three_point_track().samples();
        let x = TimeScale::new(samples.domain(), (0.0, 700.0));
        let y = LinearScale::new((0.0, 40.0), (80.0, 0.0));
        match elevation_area(&samples, &x, &y, 80.0) {
            ChartPrimitive::Area { baseline, points, .. } => {
                assert_eq!(baseline, 80.0);
                assert_eq!(points, vec![(0.0, 60.0), (350.0, 30.0), (700.0, 0.0)]);
            }
            other => panic!("unexpected primitive {:?}", other),
        }
    }

    #[test]
    fn scene_updates_in_place() {
        let mut scene = ChartScene::new(700.0, 80.0, Margin::default());
        let id = scene.append(ChartPrimitive::Rect {
            class: "heart-indicator".into(),
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 80.0,
        });
        scene.update(
            id,
            ChartPrimitive::Rect {
                class: "heart-indicator".into(),
                x: 10.0,
                y: 0.0,
                width: 1.0,
                height: 80.0,
            },
        );
        assert_eq!(scene.primitives().len(), 1);
        assert!(matches!(scene.get(id), Some(ChartPrimitive::Rect { x, .. }) if *x == 10.0));
        assert_eq!(scene.outer_size(), (740.0, 100.0));
    }
}
