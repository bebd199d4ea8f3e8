//! The map-rendering surface the engine drives.
//!
//! The engine never renders anything itself. It reads bounds and zoom from a
//! [`MapSurface`] and asks it to move; the host forwards the surface's own
//! move-end / zoom-end notifications back as commands.

use foundation::bounds::Bbox;
use foundation::geo::{LngLat, ScreenPoint};
use foundation::math::mercator::{project_px, unproject_px};

pub trait MapSurface {
    /// Visible bounds, or `None` while the surface has not settled yet.
    fn bounds(&self) -> Option<Bbox>;

    /// Current (possibly fractional) zoom.
    fn zoom(&self) -> f64;

    fn center(&self) -> LngLat;

    /// Animated transition to `center` at `zoom`.
    fn fly_to(&mut self, center: LngLat, zoom: f64, duration_ms: u64);

    /// Immediate jump without animation.
    fn set_view(&mut self, center: LngLat, zoom: f64);

    /// Touch surfaces never auto-open detail affordances.
    fn is_touch(&self) -> bool {
        false
    }
}

/// A recorded camera move on a [`HeadlessSurface`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Flight {
    pub center: LngLat,
    pub zoom: f64,
    /// `None` for `set_view`.
    pub duration_ms: Option<u64>,
}

/// A deterministic, window-less surface.
///
/// Bounds are derived from the center, zoom and pixel size through Web
/// Mercator, the way a slippy map computes them. Moves land instantly and are
/// recorded in [`HeadlessSurface::flights`].
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    center: LngLat,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    width_px: f64,
    height_px: f64,
    tile_size: f64,
    loaded: bool,
    touch: bool,
    flights: Vec<Flight>,
}

impl HeadlessSurface {
    pub fn new(center: LngLat, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            center,
            zoom,
            min_zoom: 0.0,
            max_zoom: 22.0,
            width_px,
            height_px,
            tile_size: 256.0,
            loaded: true,
            touch: false,
            flights: Vec::new(),
        }
    }

    pub fn with_zoom_range(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
        self
    }

    pub fn with_tile_size(mut self, tile_size: f64) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_touch(mut self, touch: bool) -> Self {
        self.touch = touch;
        self
    }

    /// An unloaded surface reports no bounds.
    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        self.width_px = width_px;
        self.height_px = height_px;
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    pub fn last_flight(&self) -> Option<Flight> {
        self.flights.last().copied()
    }

    fn jump(&mut self, center: LngLat, zoom: f64, duration_ms: Option<u64>) {
        self.center = center;
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.flights.push(Flight {
            center,
            zoom: self.zoom,
            duration_ms,
        });
    }
}

impl MapSurface for HeadlessSurface {
    fn bounds(&self) -> Option<Bbox> {
        if !self.loaded || !(self.width_px > 0.0 && self.height_px > 0.0) {
            return None;
        }
        let c = project_px(self.center, self.zoom, self.tile_size);
        let half_w = self.width_px * 0.5;
        let half_h = self.height_px * 0.5;
        let nw = unproject_px(ScreenPoint::new(c.x - half_w, c.y - half_h), self.zoom, self.tile_size);
        let se = unproject_px(ScreenPoint::new(c.x + half_w, c.y + half_h), self.zoom, self.tile_size);
        Some(Bbox::new(nw.lng, se.lat, se.lng, nw.lat))
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn center(&self) -> LngLat {
        self.center
    }

    fn fly_to(&mut self, center: LngLat, zoom: f64, duration_ms: u64) {
        self.jump(center, zoom, Some(duration_ms));
    }

    fn set_view(&mut self, center: LngLat, zoom: f64) {
        self.jump(center, zoom, None);
    }

    fn is_touch(&self) -> bool {
        self.touch
    }
}
