/// One-shot AND of index, base layer and first visibility computation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadyGate {
    index_ready: bool,
    tiles_ready: bool,
    visible_once: bool,
    fired: bool,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips false while a rebuild is pending.
    pub fn set_index_ready(&mut self, ready: bool) {
        self.index_ready = ready;
    }

    pub fn index_ready(&self) -> bool {
        self.index_ready
    }

    pub fn set_tiles_ready(&mut self) {
        self.tiles_ready = true;
    }

    pub fn set_visible_once(&mut self) {
        self.visible_once = true;
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// `true` exactly once: the first call after all three conditions hold.
    pub fn poll(&mut self) -> bool {
        if self.fired || !(self.index_ready && self.tiles_ready && self.visible_once) {
            return false;
        }
        self.fired = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::ReadyGate;

    #[test]
    fn fires_once_after_all_three() {
        let mut g = ReadyGate::new();
        g.set_index_ready(true);
        assert!(!g.poll());
        g.set_tiles_ready();
        assert!(!g.poll());
        g.set_visible_once();
        assert!(g.poll());
        assert!(!g.poll());

        g.set_index_ready(false);
        g.set_index_ready(true);
        assert!(!g.poll());
        assert!(g.has_fired());
    }

    #[test]
    fn order_of_conditions_does_not_matter() {
        let mut g = ReadyGate::new();
        g.set_visible_once();
        g.set_tiles_ready();
        assert!(!g.poll());
        g.set_index_ready(true);
        assert!(g.poll());
    }
}
