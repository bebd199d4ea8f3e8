/// A WGS84 position in degrees.
///
/// Field order follows GeoJSON (`[lng, lat]`), which is also the order used by
/// bounding boxes (`[west, south, east, north]`).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn from_array(a: [f64; 2]) -> Self {
        Self::new(a[0], a[1])
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// True when both components are finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

/// A position in screen pixel space at some zoom level.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[cfg(test)]
mod tests {
    use super::{LngLat, ScreenPoint};

    #[test]
    fn validity_rejects_non_finite_and_out_of_range() {
        assert!(LngLat::new(-8.2, 53.5).is_valid());
        assert!(LngLat::new(180.0, -90.0).is_valid());
        assert!(!LngLat::new(f64::NAN, 53.5).is_valid());
        assert!(!LngLat::new(-8.2, f64::INFINITY).is_valid());
        assert!(!LngLat::new(181.0, 0.0).is_valid());
        assert!(!LngLat::new(0.0, 91.0).is_valid());
    }

    #[test]
    fn screen_distance_is_euclidean() {
        let a = ScreenPoint::new(0.0, 0.0);
        let b = ScreenPoint::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
    }
}
