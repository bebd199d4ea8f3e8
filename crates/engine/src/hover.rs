use cluster::{ClusterId, ClusterIndex, Rendered};
use foundation::bounds::Bbox;
use foundation::geo::LngLat;
use foundation::math::mercator::project_px;
use foundation::math::precision::stable_total_cmp_f64;
use tracing::debug;

use crate::config::HoverConfig;

/// Units rendered in a tiny box around `at`.
pub fn units_near(index: &ClusterIndex, at: LngLat, zoom: i32, eps: f64) -> Vec<Rendered> {
    index.clusters(Bbox::around(at, eps), zoom)
}

/// True when `at` does not render as a lone point at `zoom`: a cluster sits on
/// it, or several raw points share the hit box.
pub fn is_clustered_at(index: &ClusterIndex, at: LngLat, zoom: i32, eps: f64) -> bool {
    let hits = units_near(index, at, zoom, eps);
    if hits.iter().any(|h| h.as_cluster().is_some()) {
        return true;
    }
    hits.iter().filter(|h| h.point_index().is_some()).count() > 1
}

/// Which step of [`HoverResolver::resolve`] produced the cluster.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HoverHit {
    Exact(ClusterId),
    Nearest { cluster: ClusterId, distance_px: f64 },
}

impl HoverHit {
    pub fn cluster(&self) -> ClusterId {
        match self {
            HoverHit::Exact(id) => *id,
            HoverHit::Nearest { cluster, .. } => *cluster,
        }
    }
}

/// Maps a point that has no marker of its own to the cluster drawn for it.
#[derive(Debug, Clone)]
pub struct HoverResolver {
    hit_epsilon_deg: f64,
    max_pixel_distance: f64,
    tile_size: f64,
}

impl HoverResolver {
    pub fn new(config: &HoverConfig, tile_size: f64) -> Self {
        Self {
            hit_epsilon_deg: config.hit_epsilon_deg,
            max_pixel_distance: config.max_pixel_distance,
            tile_size,
        }
    }

    /// Exact hit at the rounded zoom first, then the nearest rendered
    /// cluster in screen space if it is within `max_pixel_distance`.
    pub fn resolve(
        &self,
        index: &ClusterIndex,
        at: LngLat,
        zoom: f64,
        rendered: &[Rendered],
    ) -> Option<HoverHit> {
        let hits = units_near(index, at, zoom.round() as i32, self.hit_epsilon_deg);
        if let Some(c) = hits.iter().find_map(Rendered::as_cluster) {
            debug!(cluster = %c.id, "hover resolved by exact hit");
            return Some(HoverHit::Exact(c.id));
        }

        let origin = project_px(at, zoom, self.tile_size);
        let build = index.build_stamp();
        let (distance_px, cluster) = rendered
            .iter()
            .filter_map(Rendered::as_cluster)
            .filter(|c| c.id.build == build)
            .map(|c| (origin.distance(project_px(c.at, zoom, self.tile_size)), c.id))
            .min_by(|a, b| stable_total_cmp_f64(a.0, b.0).then_with(|| a.1.cmp(&b.1)))?;

        if distance_px < self.max_pixel_distance {
            debug!(cluster = %cluster, distance_px, "hover resolved by nearest cluster");
            Some(HoverHit::Nearest {
                cluster,
                distance_px,
            })
        } else {
            debug!(distance_px, "hover unresolved");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HoverHit, HoverResolver, is_clustered_at};
    use crate::config::HoverConfig;
    use cluster::{Cluster, ClusterId, ClusterIndex, ClusterOptions, Rendered};
    use foundation::bounds::Bbox;
    use foundation::geo::{LngLat, ScreenPoint};
    use foundation::math::mercator::{project_px, unproject_px};
    use pretty_assertions::assert_eq;

    const BUILD: u32 = 3;

    fn resolver() -> HoverResolver {
        HoverResolver::new(&HoverConfig::default(), 256.0)
    }

    /// A synthetic rendered cluster `dx` pixels east of `at`.
    fn cluster_east_of(at: LngLat, zoom: f64, dx: f64) -> Rendered {
        let p = project_px(at, zoom, 256.0);
        Rendered::Cluster(Cluster {
            id: ClusterId {
                build: BUILD,
                raw: 999,
            },
            at: unproject_px(ScreenPoint::new(p.x + dx, p.y), zoom, 256.0),
            count: 5,
        })
    }

    #[test]
    fn exact_hit_finds_absorbing_cluster() {
        let pts = vec![LngLat::new(-6.2603, 53.3498), LngLat::new(-6.2604, 53.3499)];
        let idx = ClusterIndex::build(ClusterOptions::default(), BUILD, &pts).unwrap();
        let rendered = idx.clusters(Bbox::new(-11.0, 51.0, -5.0, 56.0), 10);
        let hit = resolver().resolve(&idx, pts[0], 10.0, &rendered).unwrap();
        assert!(matches!(hit, HoverHit::Exact(_)));
        assert_eq!(Some(hit.cluster()), rendered[0].as_cluster().map(|c| c.id));
    }

    #[test]
    fn nearby_cluster_within_threshold_is_used() {
        let at = LngLat::new(-8.0, 53.0);
        let idx = ClusterIndex::build(ClusterOptions::default(), BUILD, &[at]).unwrap();
        let rendered = vec![cluster_east_of(at, 12.0, 10.0)];
        let hit = resolver().resolve(&idx, at, 12.0, &rendered).unwrap();
        match hit {
            HoverHit::Nearest {
                cluster,
                distance_px,
            } => {
                assert_eq!(cluster.raw, 999);
                assert!((distance_px - 10.0).abs() < 1e-6);
            }
            other => panic!("expected nearest hit, got {other:?}"),
        }
    }

    #[test]
    fn distant_cluster_is_ignored() {
        let at = LngLat::new(-8.0, 53.0);
        let idx = ClusterIndex::build(ClusterOptions::default(), BUILD, &[at]).unwrap();
        let rendered = vec![cluster_east_of(at, 12.0, 200.0)];
        assert_eq!(resolver().resolve(&idx, at, 12.0, &rendered), None);
    }

    #[test]
    fn clusters_from_other_builds_are_skipped() {
        let at = LngLat::new(-8.0, 53.0);
        let idx = ClusterIndex::build(ClusterOptions::default(), BUILD + 1, &[at]).unwrap();
        let rendered = vec![cluster_east_of(at, 12.0, 5.0)];
        assert_eq!(resolver().resolve(&idx, at, 12.0, &rendered), None);
    }

    #[test]
    fn coincident_points_count_as_clustered() {
        let at = LngLat::new(-8.0, 53.0);
        let idx = ClusterIndex::build(ClusterOptions::default(), 1, &[at, at]).unwrap();
        // Above the cluster max zoom only raw points remain, but two share the spot.
        assert!(is_clustered_at(&idx, at, 19, 1e-4));
        let lone = ClusterIndex::build(ClusterOptions::default(), 1, &[at]).unwrap();
        assert!(!is_clustered_at(&lone, at, 19, 1e-4));
    }
}
