use foundation::bounds::Bbox;
use listings::PointSet;
use tracing::debug;

/// Order-independent digest of an id set.
///
/// Ids are sorted and joined with `|` before hashing, so any permutation of
/// the same ids yields the same value.
pub fn visible_hash<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(|s| s.as_ref()).collect();
    sorted.sort_unstable();
    blake3::hash(sorted.join("|").as_bytes()).to_hex().to_string()
}

/// Emits the ids inside the current bounds whenever that set changes.
#[derive(Debug, Default)]
pub struct VisibleEmitter {
    last_hash: Option<String>,
    computed_once: bool,
}

impl VisibleEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once any computation ran against real bounds.
    pub fn computed_once(&self) -> bool {
        self.computed_once
    }

    /// Forget the last emission so the next computation always emits.
    pub fn clear(&mut self) {
        self.last_hash = None;
    }

    /// Returns the ids to publish, or `None` when bounds are unavailable or
    /// the set is unchanged since the last emission.
    pub fn compute(&mut self, bounds: Option<Bbox>, points: &PointSet) -> Option<Vec<String>> {
        let bounds = bounds?;
        self.computed_once = true;

        let ids = points.ids_within(&bounds);
        let hash = visible_hash(&ids);
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            return None;
        }
        debug!(visible = ids.len(), "visible set changed");
        self.last_hash = Some(hash);
        Some(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::{VisibleEmitter, visible_hash};
    use foundation::bounds::Bbox;
    use listings::{DomainRecord, PointSet, Projector};
    use pretty_assertions::assert_eq;

    fn set(points: &[(&str, f64, f64)]) -> PointSet {
        let records: Vec<DomainRecord> = points
            .iter()
            .map(|(id, lng, lat)| DomainRecord {
                id: id.to_string(),
                lng: Some(*lng),
                lat: Some(*lat),
                ..DomainRecord::default()
            })
            .collect();
        PointSet::new(Projector::default().project(&records))
    }

    const IRELAND: Bbox = Bbox {
        west: -10.8,
        south: 51.3,
        east: -5.3,
        north: 55.5,
    };

    #[test]
    fn hash_ignores_order() {
        assert_eq!(visible_hash(&["b", "a", "c"]), visible_hash(&["c", "b", "a"]));
        assert_ne!(visible_hash(&["a"]), visible_hash(&["a", "b"]));
    }

    #[test]
    fn emits_once_for_unchanged_state() {
        let points = set(&[("a", -8.0, 53.0), ("b", 2.0, 48.0)]);
        let mut e = VisibleEmitter::new();
        assert_eq!(e.compute(Some(IRELAND), &points), Some(vec!["a".to_string()]));
        assert_eq!(e.compute(Some(IRELAND), &points), None);
    }

    #[test]
    fn missing_bounds_is_a_quiet_no_op() {
        let points = set(&[("a", -8.0, 53.0)]);
        let mut e = VisibleEmitter::new();
        assert_eq!(e.compute(None, &points), None);
        assert!(!e.computed_once());
        e.compute(Some(IRELAND), &points);
        assert!(e.computed_once());
    }

    #[test]
    fn clear_forces_re_emission() {
        let points = set(&[("a", -8.0, 53.0)]);
        let mut e = VisibleEmitter::new();
        e.compute(Some(IRELAND), &points);
        e.clear();
        assert_eq!(e.compute(Some(IRELAND), &points), Some(vec!["a".to_string()]));
    }

    #[test]
    fn empty_set_is_emitted_first_time() {
        let points = set(&[]);
        let mut e = VisibleEmitter::new();
        assert_eq!(e.compute(Some(IRELAND), &points), Some(Vec::new()));
        assert_eq!(e.compute(Some(IRELAND), &points), None);
    }
}
