//! One viewing session: a loaded track wired to a map, a chart and a slider.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::binder::CursorBinder;
use crate::chart::{elevation_area, heart_line, ChartPrimitive, ChartSurface, PrimitiveId};
use crate::config::ViewConfig;
use crate::format::ValueLabel;
use crate::map::{LayerId, LayerStyle, MapLayer, MapSurface};
use crate::scale::{ColorScale, LinearScale, TimeScale};
use crate::segment::segments;
use crate::series::{Sample, TimeSeries};
use crate::slider::Slider;
use crate::{Track, TrackError, TrackSample};

/// State handed to every bound view.
pub struct SessionViews<M, C> {
    pub map: M,
    pub chart: C,
    marker: LayerId,
    label: PrimitiveId,
    connector: PrimitiveId,
    cursor: DateTime<Utc>,
    time_scale: TimeScale,
    heart_scale: LinearScale,
    heart_label: ValueLabel,
    chart_height: f64,
    label_offset_y: f64,
}

/// Outcome of one cursor move.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrubReport {
    pub cursor: DateTime<Utc>,
    pub elapsed: String,
    pub sample: Sample<TrackSample>,
    pub heart_label: String,
}

pub struct Session<M, C> {
    track: Track,
    samples: Arc<TimeSeries<TrackSample>>,
    slider: Slider,
    heart_colors: ColorScale,
    elevation_scale: LinearScale,
    views: SessionViews<M, C>,
    binder: CursorBinder<TrackSample, SessionViews<M, C>>,
}

impl<M, C> Session<M, C>
where
    M: MapSurface + 'static,
    C: ChartSurface + 'static,
{
    /// Builds every series and scale, populates the map and the chart and
    /// binds the `place` and `heart` views. Nothing is returned unless the
    /// whole setup succeeded.
    pub fn new(track: Track, mut map: M, mut chart: C, config: &ViewConfig) -> Result<Self, TrackError> {
        config.validate()?;
        let (low, high) = config.heart_colors()?;
        let casing = config.casing_rgb()?;

        let samples = Arc::new(track.samples());
        let domain = samples.domain();
        let heart_extent = track.heart_rate_extent();
        let heart_colors = ColorScale::new(heart_extent.unwrap_or((0.0, 0.0)), low, high);

        map.add_layer(MapLayer::Line {
            path: track.points().iter().map(|p| p.position()).collect(),
            style: LayerStyle {
                weight: config.casing_weight,
                color: casing,
                opacity: 1.0,
            },
        });
        map.add_layer(MapLayer::Segments(
            segments(&track)
                .iter()
                .map(|seg| {
                    let style = seg.style(&heart_colors, config.elevation_weight_divisor);
                    (seg.start.position, seg.end.position, style)
                })
                .collect(),
        ));
        let first = samples.first().value.position;
        let marker = map.add_layer(MapLayer::Marker {
            position: first,
            style: config.marker.clone(),
        });
        map.fit_bounds(track.bounds());

        let slider = Slider::new(domain, config.slider_width, config.margin);
        let time_scale = slider.scale();
        let height = config.chart_height;
        let heart_max = heart_extent.map(|(_, hi)| hi).unwrap_or(0.0);
        let heart_scale = LinearScale::new((0.0, heart_max), (height, 0.0));
        let elevation_scale = LinearScale::new((0.0, track.max_elevation().max(0.0)), (height, 0.0));

        chart.append(elevation_area(&samples, &time_scale, &elevation_scale, height));
        chart.append(heart_line(&samples, &time_scale, &heart_scale));
        let label = chart.append(ChartPrimitive::Text {
            class: "heart-label".to_string(),
            x: 0.0,
            y: config.label_offset_y,
            text: String::new(),
        });
        let connector = chart.append(ChartPrimitive::Rect {
            class: "heart-indicator".to_string(),
            x: -1.0,
            y: 0.0,
            width: 1.0,
            height,
        });

        let mut binder = CursorBinder::new(Arc::clone(&samples), config.range_policy);
        binder.bind_view("place", |v: &mut SessionViews<M, C>, s: &Sample<TrackSample>| {
            v.map.set_marker_position(v.marker, s.value.position);
        });
        binder.bind_view("heart", |v: &mut SessionViews<M, C>, s: &Sample<TrackSample>| {
            let x = v.time_scale.apply(v.cursor);
            v.chart.update(
                v.label,
                ChartPrimitive::Text {
                    class: "heart-label".to_string(),
                            x,
                    y: v.label_offset_y,
                    text: v.heart_label.format(s.value.heart_rate),
                },
            );
            let top = s
                .value
                .heart_rate
                .map(|hr| v.heart_scale.apply(hr))
                .unwrap_or(v.chart_height);
            v.chart.update(
                v.connector,
                ChartPrimitive::Rect {
                    class: "heart-indicator".to_string(),
                    x: x - 1.0,
                    y: top,
                    width: 1.0,
                    height: v.chart_height - top,
                },
            );
        });

        let views = SessionViews {
            map,
            chart,
            marker,
            label,
            connector,
            cursor: domain.start,
            time_scale,
            heart_scale,
            heart_label: config.heart_label(),
            chart_height: height,
            label_offset_y: config.label_offset_y,
        };

        let mut session = Self {
            track,
            samples,
            slider,
            heart_colors,
            elevation_scale,
            views,
            binder,
        };
        session.scrub(domain.start)?;
        info!(
            "Session ready: {} samples over {}s",
            session.samples.len(),
            domain.span().num_seconds()
        );
        Ok(session)
    }

    /// Moves the cursor to `query` and updates every bound view.
    pub fn scrub(&mut self, query: DateTime<Utc>) -> Result<ScrubReport, TrackError> {
        let shown = self.slider.domain().clamp(query);
        let previous = std::mem::replace(&mut self.views.cursor, shown);
        let sample = match self.binder.scrub(&mut self.views, query) {
            Ok(sample) => sample.clone(),
            Err(err) => {
                self.views.cursor = previous;
                return Err(err);
            }
        };
        self.slider.set_value(query);
        debug!(cursor = %shown, index = sample.index, "cursor moved");
        Ok(ScrubReport {
            cursor: shown,
            elapsed: self.slider.label(shown),
            heart_label: self.views.heart_label.format(sample.value.heart_rate),
            sample,
        })
    }

    /// Moves the cursor to the instant under a slider pixel offset.
    pub fn scrub_pixel(&mut self, pixel: f64) -> Result<ScrubReport, TrackError> {
        let t = self.slider.time_at(pixel);
        self.scrub(t)
    }
}

impl<M, C> Session<M, C> {
    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn samples(&self) -> &TimeSeries<TrackSample> {
        &self.samples
    }

    pub fn slider(&self) -> &Slider {
        &self.slider
    }

    pub fn map(&self) -> &M {
        &self.views.map
    }

    pub fn chart(&self) -> &C {
        &self.views.chart
    }

    pub fn marker(&self) -> LayerId {
        self.views.marker
    }

    pub fn heart_colors(&self) -> &ColorScale {
        &self.heart_colors
    }

    pub fn heart_scale(&self) -> &LinearScale {
        &self.views.heart_scale
    }

    pub fn elevation_scale(&self) -> &LinearScale {
        &self.elevation_scale
    }

    pub fn view_names(&self) -> Vec<&str> {
        self.binder.view_names().collect()
    }

    pub fn into_surfaces(self) -> (M, C) {
        (self.views.map, self.views.chart)
    }
}
