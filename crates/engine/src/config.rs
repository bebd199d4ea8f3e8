use std::path::Path;

use cluster::ClusterOptions;
use foundation::bounds::Bbox;
use foundation::geo::LngLat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid(String),
    Io(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
            ConfigError::Io(msg) => write!(f, "config read error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoverConfig {
    /// Half-width of the exact hit box, in degrees.
    pub hit_epsilon_deg: f64,
    /// Nearest-cluster fallback only accepts clusters closer than this.
    pub max_pixel_distance: f64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            hit_epsilon_deg: 1e-4,
            max_pixel_distance: 48.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpansionConfig {
    /// Minimum zoom-in applied on cluster activation.
    pub zoom_bias: f64,
    pub fly_duration_ms: u64,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            zoom_bias: 1.0,
            fly_duration_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusConfig {
    pub zoom_hint: f64,
    pub fly_duration_ms: u64,
    /// Wait after a focus fly before hovering / opening the detail.
    pub settle_delay_ms: u64,
    /// Interval between zoom steps while un-clustering a focused point.
    pub uncluster_step_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            zoom_hint: 16.0,
            fly_duration_ms: 450,
            settle_delay_ms: 280,
            uncluster_step_ms: 260,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub cluster: ClusterOptions,
    pub map_max_zoom: u8,
    pub map_min_zoom: u8,
    /// `[west, south, east, north]` restored by a viewport reset.
    pub default_bbox: [f64; 4],
    /// `[lng, lat]`
    pub default_center: [f64; 2],
    pub default_zoom: f64,
    pub default_zoom_touch: f64,
    /// Grid the tracked bbox is snapped to, in degrees.
    pub bbox_precision: f64,
    pub hover: HoverConfig,
    pub expansion: ExpansionConfig,
    pub focus: FocusConfig,
    /// Visible-set emissions after boot; `0` is the next frame.
    pub emit_retry_delays_ms: Vec<u64>,
    pub tile_size_px: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterOptions::default(),
            map_max_zoom: 18,
            map_min_zoom: 5,
            default_bbox: [-10.8, 51.3, -5.3, 55.5],
            default_center: [-8.2, 53.5],
            default_zoom: 7.0,
            default_zoom_touch: 6.0,
            bbox_precision: 1e-6,
            hover: HoverConfig::default(),
            expansion: ExpansionConfig::default(),
            focus: FocusConfig::default(),
            emit_retry_delays_ms: vec![0, 16, 120],
            tile_size_px: 256.0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate. Missing keys take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cluster
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.map_min_zoom > self.map_max_zoom {
            return Err(ConfigError::Invalid(format!(
                "mapMinZoom {} exceeds mapMaxZoom {}",
                self.map_min_zoom, self.map_max_zoom
            )));
        }
        let b = self.default_bbox();
        if !b.is_finite() || b.west >= b.east || b.south >= b.north {
            return Err(ConfigError::Invalid(format!(
                "defaultBbox {:?} is not a valid box",
                self.default_bbox
            )));
        }
        if !self.default_center().is_valid() {
            return Err(ConfigError::Invalid(format!(
                "defaultCenter {:?} is not a valid position",
                self.default_center
            )));
        }
        for (name, v) in [
            ("bboxPrecision", self.bbox_precision),
            ("hover.hitEpsilonDeg", self.hover.hit_epsilon_deg),
            ("hover.maxPixelDistance", self.hover.max_pixel_distance),
            ("tileSizePx", self.tile_size_px),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")));
            }
        }
        if !(self.expansion.zoom_bias.is_finite() && self.expansion.zoom_bias >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "expansion.zoomBias must be non-negative, got {}",
                self.expansion.zoom_bias
            )));
        }
        Ok(())
    }

    pub fn default_bbox(&self) -> Bbox {
        Bbox::from_array(self.default_bbox)
    }

    pub fn default_center(&self) -> LngLat {
        LngLat::from_array(self.default_center)
    }

    pub fn initial_zoom(&self, touch: bool) -> f64 {
        let z = if touch {
            self.default_zoom_touch
        } else {
            self.default_zoom
        };
        z.min(self.max_zoom())
    }

    pub fn max_zoom(&self) -> f64 {
        self.map_max_zoom as f64
    }

    pub fn min_zoom(&self) -> f64 {
        self.map_min_zoom as f64
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_validate() {
        let c = EngineConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.initial_zoom(false), 7.0);
        assert_eq!(c.initial_zoom(true), 6.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = EngineConfig::from_json_str(
            r#"{ "mapMaxZoom": 17, "hover": { "maxPixelDistance": 30 }, "cluster": { "radius": 60 } }"#,
        )
        .unwrap();
        assert_eq!(c.map_max_zoom, 17);
        assert_eq!(c.hover.max_pixel_distance, 30.0);
        assert_eq!(c.hover.hit_epsilon_deg, 1e-4);
        assert_eq!(c.cluster.radius, 60.0);
        assert_eq!(c.cluster.min_points, 2);
        assert_eq!(c.emit_retry_delays_ms, vec![0, 16, 120]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "mapMinZoom": 19 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "defaultBbox": [0, 0, -1, 1] }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "cluster": { "minPoints": 1 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "bboxPrecision": 0.001 }"#).unwrap();
        assert_eq!(EngineConfig::from_path(&path).unwrap().bbox_precision, 0.001);
        assert!(matches!(
            EngineConfig::from_path(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
