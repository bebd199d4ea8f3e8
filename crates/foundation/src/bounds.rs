use crate::geo::LngLat;
use crate::math::precision::round_to;

/// Axis-aligned planar bounding box.
///
/// Used for projected (unit-square Web Mercator) coordinates; `min[1]` is the
/// northern edge once latitudes are projected because mercator `y` grows
/// southwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_point(p: [f64; 2]) -> Self {
        Aabb2 { min: p, max: p }
    }

    pub fn union(&self, other: &Aabb2) -> Aabb2 {
        Aabb2::new(
            [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        )
    }

    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }

    pub fn contains_point(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }

    /// Squared distance from `p` to the closest point of the box (0 inside).
    pub fn distance2_to(&self, p: [f64; 2]) -> f64 {
        let dx = (self.min[0] - p[0]).max(0.0).max(p[0] - self.max[0]);
        let dy = (self.min[1] - p[1]).max(0.0).max(p[1] - self.max[1]);
        dx * dx + dy * dy
    }
}

/// Geographic bounding box in degrees: `[west, south, east, north]`.
///
/// Equality is exact on the stored values. Callers that feed map-surface
/// bounds in should go through [`Bbox::rounded`] first so that float noise
/// from the renderer does not register as a change.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bbox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bbox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn from_array(a: [f64; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Degenerate box of half-width `eps` centred on `at`.
    pub fn around(at: LngLat, eps: f64) -> Self {
        Self::new(at.lng - eps, at.lat - eps, at.lng + eps, at.lat + eps)
    }

    /// Snap every edge to a multiple of `precision` degrees.
    pub fn rounded(self, precision: f64) -> Self {
        Self::new(
            round_to(self.west, precision),
            round_to(self.south, precision),
            round_to(self.east, precision),
            round_to(self.north, precision),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
    }

    /// Inclusive containment test. Boxes are not wrapped across the
    /// antimeridian here; the cluster index handles wrapping on its own.
    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.west && p.lng <= self.east && p.lat >= self.south && p.lat <= self.north
    }

    pub fn center(&self) -> LngLat {
        LngLat::new((self.west + self.east) * 0.5, (self.south + self.north) * 0.5)
    }
}
