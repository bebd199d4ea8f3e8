use cluster::{ClusterId, ClusterIndex};
use foundation::geo::LngLat;
use tracing::debug;

use crate::config::ExpansionConfig;
use crate::hover::units_near;

/// Leaves requested when a cluster cannot be split any further.
pub const PICK_LEAF_LIMIT: usize = 10_000;

/// `min(max(expansion, current + bias), max_zoom)`.
pub fn desired_zoom(expansion: f64, current: f64, bias: f64, max_zoom: f64) -> f64 {
    expansion.max(current + bias).min(max_zoom)
}

/// Where to fly after a cluster was activated.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ExpansionPlan {
    pub cluster: ClusterId,
    pub at: LngLat,
    pub zoom: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ExpansionController {
    zoom_bias: f64,
    fly_duration_ms: u64,
    max_zoom: f64,
}

impl ExpansionController {
    pub fn new(config: &ExpansionConfig, max_zoom: f64) -> Self {
        Self {
            zoom_bias: config.zoom_bias,
            fly_duration_ms: config.fly_duration_ms,
            max_zoom,
        }
    }

    pub fn fly_duration_ms(&self) -> u64 {
        self.fly_duration_ms
    }

    /// Plan the zoom-in for `cluster`.
    ///
    /// An id the index cannot resolve still zooms in by the bias.
    pub fn on_activate(
        &self,
        index: &ClusterIndex,
        cluster: ClusterId,
        at: LngLat,
        current_zoom: f64,
    ) -> ExpansionPlan {
        let expansion = match index.expansion_zoom(cluster) {
            Ok(z) => z as f64,
            Err(err) => {
                debug!(%err, "expansion zoom unavailable; stepping in");
                current_zoom
            }
        };
        let zoom = desired_zoom(expansion, current_zoom, self.zoom_bias, self.max_zoom);
        debug!(cluster = %cluster, expansion, zoom, "cluster expansion");
        ExpansionPlan {
            cluster,
            at,
            zoom,
            duration_ms: self.fly_duration_ms,
        }
    }

    /// Leaf indices of `cluster` when the surface is at max zoom and the spot
    /// still renders as a cluster.
    pub fn pick_leaves(
        &self,
        index: &ClusterIndex,
        cluster: ClusterId,
        at: LngLat,
        zoom_now: f64,
        hit_eps: f64,
    ) -> Option<Vec<usize>> {
        if zoom_now < self.max_zoom {
            return None;
        }
        let still_clustered = units_near(index, at, zoom_now.round() as i32, hit_eps)
            .iter()
            .any(|r| r.as_cluster().is_some());
        if !still_clustered {
            return None;
        }
        match index.leaves(cluster, PICK_LEAF_LIMIT, 0) {
            Ok(leaves) => Some(leaves),
            Err(err) => {
                debug!(%err, "cluster pick skipped");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExpansionController, desired_zoom};
    use crate::config::ExpansionConfig;
    use cluster::{ClusterId, ClusterIndex, ClusterOptions};
    use foundation::bounds::Bbox;
    use foundation::geo::LngLat;
    use pretty_assertions::assert_eq;

    fn controller(max_zoom: f64) -> ExpansionController {
        ExpansionController::new(&ExpansionConfig::default(), max_zoom)
    }

    #[test]
    fn desired_zoom_floors_and_caps() {
        assert_eq!(desired_zoom(12.0, 8.0, 1.0, 18.0), 12.0);
        assert_eq!(desired_zoom(8.0, 8.0, 1.0, 18.0), 9.0);
        assert_eq!(desired_zoom(25.0, 8.0, 1.0, 18.0), 18.0);
        assert_eq!(desired_zoom(3.0, 18.0, 1.0, 18.0), 18.0);
    }

    #[test]
    fn activation_flies_past_the_split() {
        let pts = vec![LngLat::new(-6.26, 53.35), LngLat::new(-6.27, 53.35)];
        let idx = ClusterIndex::build(ClusterOptions::default(), 1, &pts).unwrap();
        let c = idx
            .clusters(Bbox::new(-7.0, 53.0, -6.0, 54.0), 6)
            .into_iter()
            .find_map(|r| r.as_cluster().copied())
            .unwrap();
        let plan = controller(18.0).on_activate(&idx, c.id, c.at, 6.0);
        assert!(plan.zoom >= 7.0);
        assert_eq!(plan.zoom, idx.expansion_zoom(c.id).unwrap() as f64);
        assert_eq!(plan.duration_ms, 250);
    }

    #[test]
    fn stale_cluster_still_steps_in() {
        let pts = vec![LngLat::new(-6.26, 53.35)];
        let idx = ClusterIndex::build(ClusterOptions::default(), 2, &pts).unwrap();
        let stale = ClusterId { build: 1, raw: 77 };
        let plan = controller(18.0).on_activate(&idx, stale, pts[0], 10.0);
        assert_eq!(plan.zoom, 11.0);
    }

    #[test]
    fn pick_only_at_max_zoom_for_coincident_members() {
        let at = LngLat::new(-6.26, 53.35);
        let idx = ClusterIndex::build(ClusterOptions::default(), 1, &[at, at, at]).unwrap();
        let c = idx
            .clusters(Bbox::around(at, 0.01), 18)
            .into_iter()
            .find_map(|r| r.as_cluster().copied())
            .unwrap();
        let ctl = controller(18.0);
        assert_eq!(ctl.pick_leaves(&idx, c.id, at, 17.0, 1e-4), None);
        let mut leaves = ctl.pick_leaves(&idx, c.id, at, 18.0, 1e-4).unwrap();
        leaves.sort();
        assert_eq!(leaves, vec![0, 1, 2]);
    }
}
