use foundation::geo::LngLat;

/// `min(max_zoom, max(current, hint))`: never zooms out to focus.
pub fn focus_zoom(current: f64, hint: f64, max_zoom: f64) -> f64 {
    current.max(hint).min(max_zoom)
}

/// Focus-follow state shared between marker clicks and focus commands.
#[derive(Debug, Default)]
pub struct FocusController {
    suppress_next: bool,
}

impl FocusController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A marker click already has the point on screen; skip the next fly.
    pub fn note_marker_select(&mut self) {
        self.suppress_next = true;
    }

    /// Consume the suppression flag.
    pub fn take_suppressed(&mut self) -> bool {
        std::mem::take(&mut self.suppress_next)
    }
}

/// What an un-cluster step asks the surface to do next.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UnclusterStep {
    /// Fly one level closer and check again after the step interval.
    Continue { zoom: f64 },
    /// Settle at `zoom` and hover the point.
    Finish { zoom: f64 },
}

/// Zooms towards a point one level at a time until it renders on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Uncluster {
    pub id: String,
    pub at: LngLat,
    zoom: f64,
    max_zoom: f64,
}

impl Uncluster {
    /// Starts at `max(current, min(hint, max_zoom))`.
    pub fn start(id: impl Into<String>, at: LngLat, current: f64, hint: f64, max_zoom: f64) -> Self {
        Self {
            id: id.into(),
            at,
            zoom: current.max(hint.min(max_zoom)),
            max_zoom,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn step(&mut self, clustered: bool) -> UnclusterStep {
        if !clustered || self.zoom >= self.max_zoom {
            return UnclusterStep::Finish {
                zoom: self.zoom.min(self.max_zoom),
            };
        }
        self.zoom = (self.zoom + 1.0).min(self.max_zoom);
        UnclusterStep::Continue { zoom: self.zoom }
    }
}

#[cfg(test)]
mod tests {
    use super::{FocusController, Uncluster, UnclusterStep, focus_zoom};
    use foundation::geo::LngLat;
    use pretty_assertions::assert_eq;

    #[test]
    fn focus_zoom_never_zooms_out() {
        assert_eq!(focus_zoom(7.0, 16.0, 18.0), 16.0);
        assert_eq!(focus_zoom(17.0, 16.0, 18.0), 17.0);
        assert_eq!(focus_zoom(7.0, 20.0, 18.0), 18.0);
    }

    #[test]
    fn suppression_is_one_shot() {
        let mut f = FocusController::new();
        assert!(!f.take_suppressed());
        f.note_marker_select();
        assert!(f.take_suppressed());
        assert!(!f.take_suppressed());
    }

    #[test]
    fn uncluster_steps_until_clear_or_max() {
        let mut u = Uncluster::start("a", LngLat::new(0.0, 0.0), 10.0, 15.0, 17.0);
        assert_eq!(u.zoom(), 15.0);
        assert_eq!(u.step(true), UnclusterStep::Continue { zoom: 16.0 });
        assert_eq!(u.step(true), UnclusterStep::Continue { zoom: 17.0 });
        assert_eq!(u.step(true), UnclusterStep::Finish { zoom: 17.0 });

        let mut clear = Uncluster::start("b", LngLat::new(0.0, 0.0), 12.0, 11.0, 18.0);
        assert_eq!(clear.step(false), UnclusterStep::Finish { zoom: 12.0 });
    }
}
