use engine::{VisibleEmitter, desired_zoom, focus_zoom, visible_hash};
use foundation::bounds::Bbox;
use listings::{DomainRecord, PointSet, Projector};
use proptest::prelude::*;

fn id_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9]{1,8}", 0..24)
}

fn point_set(coords: &[(f64, f64)]) -> PointSet {
    let records: Vec<DomainRecord> = coords
        .iter()
        .enumerate()
        .map(|(i, &(lng, lat))| DomainRecord {
            id: format!("p{i}"),
            lng: Some(lng),
            lat: Some(lat),
            ..Default::default()
        })
        .collect();
    PointSet::new(Projector::default().project(&records))
}

proptest! {
    #[test]
    fn hash_ignores_order(ids in id_list(), seed in any::<u64>()) {
        let mut shuffled = ids.clone();
        // Deterministic rotation plus reversal is enough to exercise ordering.
        if !shuffled.is_empty() {
            let k = (seed as usize) % shuffled.len();
            shuffled.rotate_left(k);
        }
        shuffled.reverse();
        prop_assert_eq!(visible_hash(&ids), visible_hash(&shuffled));
    }

    #[test]
    fn distinct_sets_hash_differently(a in id_list(), extra in "[A-Z]{1,4}") {
        let mut b = a.clone();
        b.push(extra);
        prop_assert_ne!(visible_hash(&a), visible_hash(&b));
    }

    #[test]
    fn expansion_always_zooms_in_until_the_cap(
        expansion in 0.0f64..25.0,
        current in 0.0f64..18.0,
        max in 5.0f64..22.0,
    ) {
        let z = desired_zoom(expansion, current, 1.0, max);
        prop_assert!(z <= max);
        prop_assert!(z >= (current + 1.0).min(max));
    }

    #[test]
    fn focus_never_zooms_out_or_past_max(
        current in 0.0f64..18.0,
        hint in 0.0f64..25.0,
    ) {
        let z = focus_zoom(current, hint, 18.0);
        prop_assert!(z <= 18.0);
        prop_assert!(z >= current.min(18.0));
    }

    #[test]
    fn emission_is_idempotent_for_unchanged_bounds(
        coords in prop::collection::vec((-10.5f64..-6.0, 51.5f64..55.3), 0..40),
        west in -11.0f64..-7.0,
        south in 51.0f64..53.0,
    ) {
        let points = point_set(&coords);
        let bounds = Bbox::new(west, south, west + 3.0, south + 2.0);
        let mut emitter = VisibleEmitter::new();

        let first = emitter.compute(Some(bounds), &points);
        prop_assert!(first.is_some());
        prop_assert_eq!(emitter.compute(Some(bounds), &points), None);

        emitter.clear();
        prop_assert_eq!(emitter.compute(Some(bounds), &points), first);
    }
}
