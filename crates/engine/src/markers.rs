use std::collections::HashMap;

use foundation::arena::Arena;
use foundation::handles::Handle;

/// A mounted, interactive on-screen representation of a point.
pub trait Marker {
    /// Open the popup / detail affordance for this marker.
    fn open_detail(&mut self);
}

impl<M: Marker + ?Sized> Marker for Box<M> {
    fn open_detail(&mut self) {
        (**self).open_detail();
    }
}

/// Identity of one mount. Unmounting requires the key of the current mount.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MarkerKey(Handle);

/// Point id to mounted marker.
///
/// Markers live in a generational arena; the id map holds handles only, so a
/// key from a replaced mount can never reach the marker that replaced it.
#[derive(Debug)]
pub struct MarkerRegistry<M> {
    markers: Arena<(String, M)>,
    by_id: HashMap<String, Handle>,
}

impl<M> Default for MarkerRegistry<M> {
    fn default() -> Self {
        Self {
            markers: Arena::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<M> MarkerRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Mount `marker` for `id`, replacing any existing mount.
    pub fn register(&mut self, id: impl Into<String>, marker: M) -> MarkerKey {
        let id = id.into();
        if let Some(old) = self.by_id.remove(&id) {
            self.markers.remove(old);
        }
        let handle = self.markers.insert((id.clone(), marker));
        self.by_id.insert(id, handle);
        MarkerKey(handle)
    }

    /// Tear down the mount identified by `key`.
    ///
    /// Ignored unless `key` is the current mount for `id`.
    pub fn unregister(&mut self, id: &str, key: MarkerKey) -> Option<M> {
        if self.by_id.get(id) != Some(&key.0) {
            return None;
        }
        self.by_id.remove(id);
        self.markers.remove(key.0).map(|(_, m)| m)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&M> {
        let handle = self.by_id.get(id)?;
        self.markers.get(*handle).map(|(_, m)| m)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut M> {
        let handle = self.by_id.get(id)?;
        self.markers.get_mut(*handle).map(|(_, m)| m)
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.markers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Marker, MarkerRegistry};
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    struct Pin {
        name: &'static str,
        opened: u32,
    }

    impl Marker for Pin {
        fn open_detail(&mut self) {
            self.opened += 1;
        }
    }

    fn pin(name: &'static str) -> Pin {
        Pin { name, opened: 0 }
    }

    #[test]
    fn register_get_unregister() {
        let mut r = MarkerRegistry::new();
        let k = r.register("a", pin("first"));
        assert_eq!(r.get("a").map(|p| p.name), Some("first"));
        assert_eq!(r.unregister("a", k).map(|p| p.name), Some("first"));
        assert!(r.get("a").is_none());
        assert!(r.is_empty());
    }

    #[test]
    fn remount_replaces_and_old_unmount_is_ignored() {
        let mut r = MarkerRegistry::new();
        let old = r.register("a", pin("old"));
        let new = r.register("a", pin("new"));
        assert_eq!(r.len(), 1);

        // The stale teardown arrives after the remount.
        assert!(r.unregister("a", old).is_none());
        assert_eq!(r.get("a").map(|p| p.name), Some("new"));

        assert!(r.unregister("a", new).is_some());
        assert!(r.unregister("a", new).is_none());
    }

    #[test]
    fn keys_are_not_transferable_between_ids() {
        let mut r = MarkerRegistry::new();
        let ka = r.register("a", pin("a"));
        r.register("b", pin("b"));
        assert!(r.unregister("b", ka).is_none());
        assert!(r.contains("b"));
    }

    #[test]
    fn get_mut_reaches_marker() {
        let mut r = MarkerRegistry::new();
        r.register("a", pin("a"));
        if let Some(p) = r.get_mut("a") {
            p.open_detail();
        }
        assert_eq!(r.get("a").map(|p| p.opened), Some(1));
    }
}
