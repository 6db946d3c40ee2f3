//! Map render target seam plus an in-memory implementation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scale::Rgb;
use crate::{Bounds, LonLat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LayerStyle {
    pub weight: f64,
    pub color: Rgb,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub radius: f64,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            color: "darkred".to_string(),
            weight: 1.0,
            opacity: 1.0,
            fill_color: "red".to_string(),
            fill_opacity: 1.0,
            radius: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum MapLayer {
    /// One polyline with a single style (the casing under the route).
    Line {
        path: Vec<LonLat>,
        style: LayerStyle,
    },
    /// Two-point segments, each styled on its own.
    Segments(Vec<(LonLat, LonLat, LayerStyle)>),
    Marker {
        position: LonLat,
        style: MarkerStyle,
    },
}

pub trait MapSurface {
    fn add_layer(&mut self, layer: MapLayer) -> LayerId;
    fn fit_bounds(&mut self, bounds: Bounds);
    fn set_marker_position(&mut self, marker: LayerId, position: LonLat);
}

/// Records layers and marker moves instead of drawing them.
#[derive(Clone, Debug, Default)]
pub struct MapScene {
    layers: Vec<MapLayer>,
    bounds: Option<Bounds>,
    marker_moves: usize,
}

impl MapScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn marker_moves(&self) -> usize {
        self.marker_moves
    }

    pub fn marker_position(&self, marker: LayerId) -> Option<LonLat> {
        match self.layers.get(marker.0) {
            Some(MapLayer::Marker { position, .. }) => Some(*position),
            _ => None,
        }
    }
}

impl MapSurface for MapScene {
    fn add_layer(&mut self, layer: MapLayer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
    }

    fn set_marker_position(&mut self, marker: LayerId, position: LonLat) {
        match self.layers.get_mut(marker.0) {
            Some(MapLayer::Marker { position: current, .. }) => {
                *current = position;
                self.marker_moves += 1;
            }
            _ => debug!(layer = marker.0, "ignoring move of non-marker layer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_move_other_layers_do_not() {
        let mut scene = MapScene::new();
        let line = scene.add_layer(MapLayer::Line {
            path: vec![LonLat::new(0.0, 0.0)],
            style: LayerStyle {
                weight: 9.0,
                color: Rgb::new(255, 255, 255),
                opacity: 1.0,
            },
        });
        let marker = scene.add_layer(MapLayer::Marker {
            position: LonLat::new(0.0, 0.0),
            style: MarkerStyle::default(),
        });

        scene.set_marker_position(marker, LonLat::new(1.0, 2.0));
        scene.set_marker_position(line, LonLat::new(5.0, 5.0));

        assert_eq!(scene.marker_position(marker), Some(LonLat::new(1.0, 2.0)));
        assert_eq!(scene.marker_position(line), None);
        assert_eq!(scene.marker_moves(), 1);
    }
}
