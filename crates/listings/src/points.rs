use std::collections::HashMap;

use foundation::bounds::Bbox;
use foundation::geo::LngLat;
use tracing::debug;

use crate::record::PointFeature;

/// An immutable, id-addressable set of projected points.
///
/// `version` is a content digest over the ordered ids and positions; two sets
/// with the same version index to identical cluster hierarchies.
#[derive(Debug, Clone)]
pub struct PointSet {
    points: Vec<PointFeature>,
    by_id: HashMap<String, usize>,
    version: String,
}

impl Default for PointSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PointSet {
    /// Duplicate ids keep their first occurrence.
    pub fn new(points: Vec<PointFeature>) -> Self {
        let total = points.len();
        let mut by_id = HashMap::with_capacity(total);
        let mut kept = Vec::with_capacity(total);
        for p in points {
            if by_id.contains_key(&p.id) {
                continue;
            }
            by_id.insert(p.id.clone(), kept.len());
            kept.push(p);
        }
        if kept.len() < total {
            debug!(duplicates = total - kept.len(), "duplicate point ids ignored");
        }

        let version = version_of(&kept);
        Self {
            points: kept,
            by_id,
            version,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PointFeature] {
        &self.points
    }

    pub fn get(&self, id: &str) -> Option<&PointFeature> {
        self.index_of(id).map(|i| &self.points[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn positions(&self) -> Vec<LngLat> {
        self.points.iter().map(PointFeature::at).collect()
    }

    /// Ids of the points inside `bbox` (inclusive), in set order.
    pub fn ids_within(&self, bbox: &Bbox) -> Vec<String> {
        self.points
            .iter()
            .filter(|p| bbox.contains(p.at()))
            .map(|p| p.id.clone())
            .collect()
    }
}

fn version_of(points: &[PointFeature]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(points.len() as u64).to_le_bytes());
    for p in points {
        hasher.update(&(p.id.len() as u64).to_le_bytes());
        hasher.update(p.id.as_bytes());
        hasher.update(&p.lng.to_bits().to_le_bytes());
        hasher.update(&p.lat.to_bits().to_le_bytes());
    }
    let version = hasher.finalize().to_hex().to_string();
    debug!(points = points.len(), %version, "point set versioned");
    version
}
