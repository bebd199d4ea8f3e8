use foundation::bounds::Bbox;
use foundation::math::precision::round_to;
use tracing::trace;

use crate::surface::MapSurface;

/// Authoritative bounds and zoom for one map surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub bbox: Bbox,
    pub zoom: f64,
}

impl Viewport {
    /// Integer zoom used for index queries.
    pub fn query_zoom(&self) -> i32 {
        self.zoom.round() as i32
    }
}

/// Tracks the viewport from surface events.
///
/// Bbox and zoom are deduped independently: a write that compares equal after
/// rounding to `precision` is a no-op and reports `false`.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    precision: f64,
    bbox: Option<Bbox>,
    zoom: Option<f64>,
}

impl ViewportTracker {
    pub fn new(precision: f64) -> Self {
        Self {
            precision,
            bbox: None,
            zoom: None,
        }
    }

    pub fn is_primed(&self) -> bool {
        self.bbox.is_some() && self.zoom.is_some()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        Some(Viewport {
            bbox: self.bbox?,
            zoom: self.zoom?,
        })
    }

    pub fn bbox(&self) -> Option<Bbox> {
        self.bbox
    }

    pub fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    /// Seed from the surface once it reports bounds. Later calls are no-ops.
    pub fn prime<S: MapSurface + ?Sized>(&mut self, surface: &S) -> bool {
        if self.is_primed() {
            return false;
        }
        let Some(bounds) = surface.bounds() else {
            return false;
        };
        let bbox_changed = self.write_bbox(bounds);
        let zoom_changed = self.write_zoom(surface.zoom());
        bbox_changed || zoom_changed
    }

    /// Re-read bounds after a move. `false` when unavailable or unchanged.
    pub fn on_move_end<S: MapSurface + ?Sized>(&mut self, surface: &S) -> bool {
        let Some(bounds) = surface.bounds() else {
            return false;
        };
        let changed = self.write_bbox(bounds);
        if self.zoom.is_none() {
            self.write_zoom(surface.zoom());
        }
        changed
    }

    pub fn on_zoom_end<S: MapSurface + ?Sized>(&mut self, surface: &S) -> bool {
        self.write_zoom(surface.zoom())
    }

    /// Force the configured default. Always reports a change.
    pub fn reset(&mut self, bbox: Bbox, zoom: f64) {
        self.bbox = Some(bbox.rounded(self.precision));
        self.zoom = Some(round_to(zoom, self.precision));
    }

    fn write_bbox(&mut self, bounds: Bbox) -> bool {
        let next = bounds.rounded(self.precision);
        if !next.is_finite() {
            return false;
        }
        if self.bbox == Some(next) {
            trace!(?next, "bbox unchanged");
            return false;
        }
        self.bbox = Some(next);
        true
    }

    fn write_zoom(&mut self, zoom: f64) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let next = round_to(zoom, self.precision);
        if self.zoom == Some(next) {
            trace!(zoom = next, "zoom unchanged");
            return false;
        }
        self.zoom = Some(next);
        true
    }
}
