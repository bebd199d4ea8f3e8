//! Property tests for the cluster hierarchy.

use cluster::{ClusterIndex, ClusterOptions, Rendered};
use foundation::bounds::Bbox;
use foundation::geo::LngLat;
use proptest::prelude::*;

fn positions() -> impl Strategy<Value = Vec<LngLat>> {
    // Kept around Ireland so neighbouring points actually merge at mid zooms.
    prop::collection::vec(
        (-10.5f64..-5.5, 51.5f64..55.3).prop_map(|(lng, lat)| LngLat::new(lng, lat)),
        0..120,
    )
}

/// Box around every input point.
///
/// Units are selected by their own position (the centroid for clusters), so a
/// box cutting through a cluster may drop members whose raw position lies
/// inside it. Conservation therefore only holds for boxes enclosing all points.
fn enclosing(points: &[LngLat]) -> Bbox {
    let mut b = Bbox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for p in points {
        b.west = b.west.min(p.lng);
        b.south = b.south.min(p.lat);
        b.east = b.east.max(p.lng);
        b.north = b.north.max(p.lat);
    }
    Bbox::new(b.west - 0.01, b.south - 0.01, b.east + 0.01, b.north + 0.01)
}

proptest! {
    #[test]
    fn counts_are_conserved_at_every_zoom(points in positions(), zoom in 0i32..21) {
        let index = ClusterIndex::build(ClusterOptions::default(), 1, &points).unwrap();
        prop_assume!(!points.is_empty());
        let units = index.clusters(enclosing(&points), zoom);
        let total: u32 = units.iter().map(Rendered::count).sum();
        prop_assert_eq!(total as usize, points.len());
    }

    #[test]
    fn every_cluster_has_at_least_min_points(points in positions(), zoom in 0i32..19) {
        let options = ClusterOptions { min_points: 3, ..ClusterOptions::default() };
        let index = ClusterIndex::build(options, 1, &points).unwrap();
        prop_assume!(!points.is_empty());
        for unit in index.clusters(enclosing(&points), zoom) {
            if let Some(c) = unit.as_cluster() {
                prop_assert!(c.count >= 3);
            }
        }
    }

    #[test]
    fn leaves_partition_the_cluster(points in positions(), zoom in 0i32..12) {
        let index = ClusterIndex::build(ClusterOptions::default(), 1, &points).unwrap();
        prop_assume!(!points.is_empty());
        for unit in index.clusters(enclosing(&points), zoom) {
            let Some(c) = unit.as_cluster() else { continue };
            let mut leaves = index.leaves(c.id, usize::MAX, 0).unwrap();
            prop_assert_eq!(leaves.len(), c.count as usize);
            leaves.sort();
            leaves.dedup();
            prop_assert_eq!(leaves.len(), c.count as usize);
        }
    }

    #[test]
    fn expansion_zoom_is_finer_than_the_cluster(points in positions(), zoom in 0i32..18) {
        let options = ClusterOptions::default();
        let index = ClusterIndex::build(options.clone(), 1, &points).unwrap();
        prop_assume!(!points.is_empty());
        let bbox = enclosing(&points);
        for unit in index.clusters(bbox, zoom) {
            let Some(c) = unit.as_cluster() else { continue };
            let expansion = index.expansion_zoom(c.id).unwrap();
            prop_assert!(expansion > zoom);
            prop_assert!(expansion <= options.max_zoom as i32 + 1);

            // The cluster no longer renders whole at its expansion zoom.
            let still_whole = index
                .clusters(bbox, expansion)
                .iter()
                .filter_map(Rendered::as_cluster)
                .any(|other| other.id == c.id);
            prop_assert!(!still_whole);
        }
    }

    #[test]
    fn partial_boxes_select_units_by_centroid(
        points in positions(),
        zoom in 0i32..21,
        west in -10.5f64..-7.0,
        south in 51.5f64..54.0,
        width in 0.1f64..3.0,
        height in 0.1f64..1.5,
    ) {
        let index = ClusterIndex::build(ClusterOptions::default(), 1, &points).unwrap();
        let bbox = Bbox::new(west, south, west + width, south + height);
        let slack = 1e-9;
        for unit in index.clusters(bbox, zoom) {
            let at = unit.at();
            prop_assert!(at.lng >= bbox.west - slack && at.lng <= bbox.east + slack);
            prop_assert!(at.lat >= bbox.south - slack && at.lat <= bbox.north + slack);
        }
    }
}
