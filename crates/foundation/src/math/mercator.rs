//! Spherical Web Mercator helpers.
//!
//! Two coordinate spaces are used:
//! - unit mercator: `x, y` in `[0, 1]`, origin at the north-west corner;
//! - screen pixels at zoom `z`: unit mercator scaled by `tile_size * 2^z`.

use core::f64::consts::PI;

use crate::geo::{LngLat, ScreenPoint};

/// Latitude limit of the square Web Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Longitude to unit-mercator `x`.
pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Latitude to unit-mercator `y`, clamped to `[0, 1]`.
pub fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// World size in pixels at (possibly fractional) `zoom`.
pub fn world_size_px(tile_size: f64, zoom: f64) -> f64 {
    tile_size * 2f64.powf(zoom)
}

/// Project a geographic position to absolute screen pixels at `zoom`.
pub fn project_px(at: LngLat, zoom: f64, tile_size: f64) -> ScreenPoint {
    let scale = world_size_px(tile_size, zoom);
    ScreenPoint::new(lng_x(at.lng) * scale, lat_y(at.lat) * scale)
}

/// Inverse of [`project_px`].
pub fn unproject_px(p: ScreenPoint, zoom: f64, tile_size: f64) -> LngLat {
    let scale = world_size_px(tile_size, zoom);
    LngLat::new(x_lng(p.x / scale), y_lat(p.y / scale))
}
