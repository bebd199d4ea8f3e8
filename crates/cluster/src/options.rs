use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Highest zoom whose level id still fits the 5-bit zoom field of a cluster id.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterOptions {
    /// Cluster radius in pixels at `extent` resolution; independent of zoom.
    pub radius: f64,
    /// Tile extent the radius is expressed against.
    pub extent: f64,
    pub min_zoom: u8,
    /// Highest zoom at which points are still clustered.
    pub max_zoom: u8,
    /// Minimum number of points that form a cluster.
    pub min_points: u32,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: 100.0,
            extent: 512.0,
            min_zoom: 0,
            max_zoom: 18,
            min_points: 2,
        }
    }
}

impl ClusterOptions {
    pub fn validate(&self) -> Result<(), IndexError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(IndexError::InvalidOptions(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.extent.is_finite() && self.extent > 0.0) {
            return Err(IndexError::InvalidOptions(format!(
                "extent must be positive, got {}",
                self.extent
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(IndexError::InvalidOptions(format!(
                "minZoom {} exceeds maxZoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(IndexError::InvalidOptions(format!(
                "maxZoom {} exceeds {MAX_SUPPORTED_ZOOM}",
                self.max_zoom
            )));
        }
        if self.min_points < 2 {
            return Err(IndexError::InvalidOptions(format!(
                "minPoints must be at least 2, got {}",
                self.min_points
            )));
        }
        Ok(())
    }

    /// Cluster radius in unit-mercator units at `zoom`.
    pub fn radius_at(&self, zoom: i32) -> f64 {
        self.radius / (self.extent * 2f64.powi(zoom))
    }
}
