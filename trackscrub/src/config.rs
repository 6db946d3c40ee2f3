use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::format::ValueLabel;
use crate::map::MarkerStyle;
use crate::scale::Rgb;
use crate::series::RangePolicy;
use crate::slider::Margin;
use crate::TrackError;

/// Layout and styling of one viewing session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub slider_width: f64,
    pub chart_height: f64,
    pub margin: Margin,
    pub heart_color_low: String,
    pub heart_color_high: String,
    pub casing_color: String,
    pub casing_weight: f64,
    pub elevation_weight_divisor: f64,
    pub marker: MarkerStyle,
    pub heart_unit: String,
    pub label_decimals: usize,
    pub label_offset_y: f64,
    pub range_policy: RangePolicy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            slider_width: 700.0,
            chart_height: 80.0,
            margin: Margin::default(),
            heart_color_low: "red".to_string(),
            heart_color_high: "white".to_string(),
            casing_color: "#fff".to_string(),
            casing_weight: 9.0,
            elevation_weight_divisor: 7.0,
            marker: MarkerStyle::default(),
            heart_unit: "bpm".to_string(),
            label_decimals: 0,
            label_offset_y: -5.0,
            range_policy: RangePolicy::Clamp,
        }
    }
}

impl ViewConfig {
    pub fn from_json_str(text: &str) -> Result<Self, TrackError> {
        let config: ViewConfig =
            serde_json::from_str(text).map_err(|e| TrackError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, TrackError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TrackError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        for (name, value) in [
            ("slider_width", self.slider_width),
            ("chart_height", self.chart_height),
            ("elevation_weight_divisor", self.elevation_weight_divisor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrackError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        self.heart_colors()?;
        self.casing_rgb()?;
        Ok(())
    }

    /// Low and high end of the heart-rate color ramp.
    pub fn heart_colors(&self) -> Result<(Rgb, Rgb), TrackError> {
        Ok((parse_color(&self.heart_color_low)?, parse_color(&self.heart_color_high)?))
    }

    pub fn casing_rgb(&self) -> Result<Rgb, TrackError> {
        parse_color(&self.casing_color)
    }

    pub fn heart_label(&self) -> ValueLabel {
        ValueLabel::new(self.heart_unit.clone(), self.label_decimals)
    }
}

fn parse_color(spec: &str) -> Result<Rgb, TrackError> {
    Rgb::parse(spec).ok_or_else(|| TrackError::Config(format!("unknown color '{}'", spec)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ViewConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.heart_colors().unwrap(),
            (Rgb::new(255, 0, 0), Rgb::new(255, 255, 255))
        );
        assert_eq!(config.heart_label().format(Some(99.4)), "99 bpm");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = ViewConfig::from_json_str(
            r#"{ "slider_width": 500, "range_policy": "strict", "margin": { "top": 5, "right": 0, "bottom": 0, "left": 0 } }"#,
        )
        .unwrap();
        assert_eq!(config.slider_width, 500.0);
        assert_eq!(config.chart_height, 80.0);
        assert_eq!(config.range_policy, RangePolicy::Strict);
        assert_eq!(config.margin.top, 5.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ViewConfig::from_json_str(r#"{ "chart_height": 0 }"#),
            Err(TrackError::Config(_))
        ));
        assert!(matches!(
            ViewConfig::from_json_str(r#"{ "heart_color_high": "mauve-ish" }"#),
            Err(TrackError::Config(_))
        ));
        assert!(ViewConfig::from_json_str("not json").is_err());
    }
}
