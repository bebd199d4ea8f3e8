use cluster::{ClusterId, ClusterIndex, Rendered};
use foundation::geo::LngLat;
use listings::{
    Basemap, DomainRecord, LayerToggles, PersistedView, PointSet, Projector, ViewStore,
};
use runtime::{Frame, Receiver, RetrySchedule, Scheduled, Scheduler, Sender, channel};
use tracing::{debug, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::expansion::ExpansionController;
use crate::focus::{FocusController, Uncluster, UnclusterStep, focus_zoom};
use crate::hover::{HoverResolver, is_clustered_at};
use crate::markers::{Marker, MarkerKey, MarkerRegistry};
use crate::ready::ReadyGate;
use crate::surface::MapSurface;
use crate::viewport::{Viewport, ViewportTracker};
use crate::visible::VisibleEmitter;

/// Extra wait after an expansion fly before checking for a cluster pick.
const PICK_CHECK_SLACK_MS: u64 = 50;

/// Inbound messages from the host UI and map surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetRecords(Vec<DomainRecord>),
    MoveEnd,
    ZoomEnd,
    Resize,
    VisibilityChange {
        visible: bool,
    },
    /// The base tile layer finished its first load.
    BaseLayerLoaded,
    Hover(Option<String>),
    /// A marker was clicked.
    Select(String),
    Focus {
        id: String,
        at: LngLat,
        zoom_hint: Option<f64>,
    },
    FocusUncluster {
        id: String,
        at: LngLat,
        zoom_hint: Option<f64>,
    },
    ActivateCluster {
        cluster: ClusterId,
        at: LngLat,
    },
    ResetViewport,
    RequeryVisible,
    SetBasemap(Basemap),
    SetOverlay {
        name: String,
        on: bool,
    },
    Shutdown,
}

/// Outbound notifications to the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    VisibleChanged(Vec<String>),
    Ready,
    /// Members of a cluster that cannot be split at max zoom.
    ClusterPicked {
        ids: Vec<String>,
        at: LngLat,
    },
    Selected(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Task {
    Rebuild { build: u32 },
    EmitVisible,
    PickCheck { cluster: ClusterId, at: LngLat },
    FocusSettle { id: String },
    UnclusterStep,
    UnclusterFinish { id: String },
}

/// The clustering and viewport-synchronization engine for one map surface.
///
/// Everything happens inside [`ClusterEngine::tick`]: queued commands are
/// handled in arrival order, then the scheduled tasks due at that frame run in
/// scheduling order. Index rebuilds are deferred one frame and a newer rebuild
/// request cancels the pending one.
pub struct ClusterEngine<S, V> {
    config: EngineConfig,
    surface: S,
    store: V,
    commands: Receiver<Command>,
    events: Sender<EngineEvent>,
    scheduler: Scheduler<Task>,

    projector: Projector,
    points: PointSet,
    index: Option<ClusterIndex>,
    next_build: u32,
    pending_build: Option<(u32, Scheduled)>,
    rendered: Vec<Rendered>,

    tracker: ViewportTracker,
    emitter: VisibleEmitter,
    markers: MarkerRegistry<Box<dyn Marker>>,
    resolver: HoverResolver,
    expansion: ExpansionController,
    focus: FocusController,
    settle: Option<Scheduled>,
    uncluster: Option<Uncluster>,
    uncluster_task: Option<Scheduled>,
    ready: ReadyGate,

    hovered: Option<String>,
    hovered_cluster: Option<ClusterId>,
    layers: LayerToggles,
    shut_down: bool,
}

impl<S: MapSurface, V: ViewStore> ClusterEngine<S, V> {
    pub fn new(
        config: EngineConfig,
        mut surface: S,
        store: V,
        commands: Receiver<Command>,
        events: Sender<EngineEvent>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        match store.load_view() {
            Ok(Some(view)) => {
                let zoom = view.zoom.min(config.max_zoom());
                debug!(center = ?view.center, zoom, "restoring persisted view");
                surface.set_view(view.center, zoom);
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "persisted view unreadable; using surface view"),
        }
        let layers = match store.load_layers() {
            Ok(layers) => layers.unwrap_or_default(),
            Err(err) => {
                warn!(%err, "persisted layers unreadable; using defaults");
                LayerToggles::default()
            }
        };

        let max_zoom = config.max_zoom();
        let mut engine = Self {
            tracker: ViewportTracker::new(config.bbox_precision),
            resolver: HoverResolver::new(&config.hover, config.tile_size_px),
            expansion: ExpansionController::new(&config.expansion, max_zoom),
            config,
            surface,
            store,
            commands,
            events,
            scheduler: Scheduler::new(),
            projector: Projector::default(),
            points: PointSet::default(),
            index: None,
            next_build: 0,
            pending_build: None,
            rendered: Vec::new(),
            emitter: VisibleEmitter::new(),
            markers: MarkerRegistry::new(),
            focus: FocusController::new(),
            settle: None,
            uncluster: None,
            uncluster_task: None,
            ready: ReadyGate::new(),
            hovered: None,
            hovered_cluster: None,
            layers,
            shut_down: false,
        };

        engine.tracker.prime(&engine.surface);
        engine.request_rebuild();
        RetrySchedule::new(engine.config.emit_retry_delays_ms.iter().copied())
            .schedule(&mut engine.scheduler, Task::EmitVisible);
        Ok(engine)
    }

    /// Build an engine together with the host's halves of both channels.
    pub fn connect(
        config: EngineConfig,
        surface: S,
        store: V,
    ) -> Result<(Self, Sender<Command>, Receiver<EngineEvent>), ConfigError> {
        let (command_tx, command_rx) = channel();
        let (event_tx, event_rx) = channel();
        let engine = Self::new(config, surface, store, command_rx, event_tx)?;
        Ok((engine, command_tx, event_rx))
    }

    /// Replace the projector, e.g. to inject a county table.
    pub fn with_projector(mut self, projector: Projector) -> Self {
        self.projector = projector;
        self
    }

    pub fn tick(&mut self, frame: Frame) {
        if self.shut_down {
            return;
        }
        for command in self.commands.drain() {
            self.handle(command);
            if self.shut_down {
                return;
            }
        }

        if !self.tracker.is_primed() && self.tracker.prime(&self.surface) {
            self.refresh_rendered();
        }

        for task in self.scheduler.run_frame(frame) {
            self.run(task);
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn store(&self) -> &V {
        &self.store
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// The installed index; `None` while a rebuild is pending.
    pub fn index(&self) -> Option<&ClusterIndex> {
        self.index.as_ref()
    }

    pub fn is_index_ready(&self) -> bool {
        self.ready.index_ready()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.tracker.viewport()
    }

    /// Clusters and points to draw for the tracked viewport.
    pub fn rendered(&self) -> &[Rendered] {
        &self.rendered
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn hovered_cluster(&self) -> Option<ClusterId> {
        self.hovered_cluster
    }

    pub fn layers(&self) -> &LayerToggles {
        &self.layers
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn mount_marker(&mut self, id: impl Into<String>, marker: Box<dyn Marker>) -> MarkerKey {
        self.markers.register(id, marker)
    }

    /// Ignored unless `key` is the current mount for `id`.
    pub fn unmount_marker(&mut self, id: &str, key: MarkerKey) -> bool {
        self.markers.unregister(id, key).is_some()
    }

    pub fn has_marker(&self, id: &str) -> bool {
        self.markers.contains(id)
    }

    /// Open a mounted marker's detail without touching index or viewport.
    pub fn open_detail(&mut self, id: &str) -> bool {
        match self.markers.get_mut(id) {
            Some(marker) => {
                marker.open_detail();
                true
            }
            None => false,
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetRecords(records) => self.set_records(&records),
            Command::MoveEnd => {
                if self.tracker.on_move_end(&self.surface) {
                    self.refresh_rendered();
                }
                self.persist_view();
                self.emit_visible();
            }
            Command::ZoomEnd => {
                if self.tracker.on_zoom_end(&self.surface) {
                    self.refresh_rendered();
                }
                self.persist_view();
                self.emit_visible();
            }
            Command::Resize | Command::VisibilityChange { visible: true } => {
                if self.tracker.on_move_end(&self.surface) {
                    self.refresh_rendered();
                }
                self.emit_visible();
            }
            Command::VisibilityChange { visible: false } => {}
            Command::BaseLayerLoaded => {
                self.ready.set_tiles_ready();
                self.poll_ready();
            }
            Command::Hover(id) => self.hover(id),
            Command::Select(id) => {
                self.focus.note_marker_select();
                self.events.send(EngineEvent::Selected(id.clone()));
                self.hover(Some(id));
            }
            Command::Focus { id, at, zoom_hint } => self.focus_on(id, at, zoom_hint),
            Command::FocusUncluster { id, at, zoom_hint } => {
                self.start_uncluster(id, at, zoom_hint)
            }
            Command::ActivateCluster { cluster, at } => self.activate_cluster(cluster, at),
            Command::ResetViewport => self.reset_viewport(),
            Command::RequeryVisible => {
                self.emitter.clear();
                self.emit_visible();
            }
            Command::SetBasemap(basemap) => {
                self.layers.basemap = basemap;
                self.persist_layers();
            }
            Command::SetOverlay { name, on } => {
                self.layers.overlays.insert(name, on);
                self.persist_layers();
            }
            Command::Shutdown => self.shutdown(),
        }
    }

    fn run(&mut self, task: Task) {
        match task {
            Task::Rebuild { build } => self.rebuild(build),
            Task::EmitVisible => self.emit_visible(),
            Task::PickCheck { cluster, at } => self.pick_check(cluster, at),
            Task::FocusSettle { id } => {
                self.settle = None;
                self.hover(Some(id.clone()));
                if !self.surface.is_touch() {
                    self.open_detail(&id);
                }
            }
            Task::UnclusterStep => self.uncluster_step(),
            Task::UnclusterFinish { id } => {
                self.uncluster_task = None;
                self.hover(Some(id));
            }
        }
    }

    fn set_records(&mut self, records: &[DomainRecord]) {
        let next = PointSet::new(self.projector.project(records));
        let has_index = self.index.is_some() || self.pending_build.is_some();
        if has_index && next.version() == self.points.version() {
            debug!(points = next.len(), "dataset unchanged; keeping index");
            return;
        }
        self.points = next;
        self.emitter.clear();
        self.request_rebuild();
        self.scheduler.next_frame(Task::EmitVisible);
    }

    fn request_rebuild(&mut self) {
        if let Some((build, pending)) = self.pending_build.take() {
            pending.cancel();
            debug!(build, "superseded index rebuild cancelled");
        }
        self.next_build = self.next_build.wrapping_add(1);
        let build = self.next_build;

        self.index = None;
        self.rendered.clear();
        self.hovered_cluster = None;
        self.ready.set_index_ready(false);

        let handle = self.scheduler.next_frame(Task::Rebuild { build });
        self.pending_build = Some((build, handle));
        debug!(build, points = self.points.len(), "index rebuild scheduled");
    }

    fn rebuild(&mut self, build: u32) {
        if self.pending_build.as_ref().map(|(pending, _)| *pending) != Some(build) {
            debug!(build, "stale rebuild ignored");
            return;
        }
        self.pending_build = None;

        match ClusterIndex::build(self.config.cluster.clone(), build, &self.points.positions()) {
            Ok(index) => {
                debug!(build, points = index.len(), "index installed");
                self.index = Some(index);
                self.ready.set_index_ready(true);
                self.refresh_rendered();
                self.poll_ready();
            }
            Err(err) => warn!(%err, build, "index build failed"),
        }
    }

    fn refresh_rendered(&mut self) {
        self.rendered = match (&self.index, self.tracker.viewport()) {
            (Some(index), Some(vp)) => index.clusters(vp.bbox, vp.query_zoom()),
            _ => Vec::new(),
        };
    }

    fn emit_visible(&mut self) {
        let bounds = self
            .surface
            .bounds()
            .map(|b| b.rounded(self.config.bbox_precision));
        if let Some(ids) = self.emitter.compute(bounds, &self.points) {
            self.events.send(EngineEvent::VisibleChanged(ids));
        }
        if self.emitter.computed_once() {
            self.ready.set_visible_once();
            self.poll_ready();
        }
    }

    fn poll_ready(&mut self) {
        if self.ready.poll() {
            debug!("engine ready");
            self.events.send(EngineEvent::Ready);
        }
    }

    fn hover(&mut self, id: Option<String>) {
        self.hovered_cluster = None;
        self.hovered = id;
        let Some(id) = self.hovered.as_deref() else {
            return;
        };
        if self.markers.contains(id) {
            return;
        }
        let (Some(index), Some(point)) = (self.index.as_ref(), self.points.get(id)) else {
            return;
        };
        let hit = self
            .resolver
            .resolve(index, point.at(), self.surface.zoom(), &self.rendered);
        self.hovered_cluster = hit.map(|h| h.cluster());
    }

    fn focus_on(&mut self, id: String, at: LngLat, zoom_hint: Option<f64>) {
        if self.focus.take_suppressed() {
            self.hover(Some(id));
            return;
        }
        let hint = zoom_hint.unwrap_or(self.config.focus.zoom_hint);
        let zoom = focus_zoom(self.surface.zoom(), hint, self.config.max_zoom());
        self.surface
            .fly_to(at, zoom, self.config.focus.fly_duration_ms);

        if let Some(previous) = self.settle.take() {
            previous.cancel();
        }
        let handle = self
            .scheduler
            .after_ms(self.config.focus.settle_delay_ms, Task::FocusSettle { id });
        self.settle = Some(handle);
    }

    fn start_uncluster(&mut self, id: String, at: LngLat, zoom_hint: Option<f64>) {
        if let Some(previous) = self.uncluster_task.take() {
            previous.cancel();
        }
        let hint = zoom_hint.unwrap_or(self.config.focus.zoom_hint);
        let job = Uncluster::start(id, at, self.surface.zoom(), hint, self.config.max_zoom());
        self.surface
            .fly_to(at, job.zoom(), self.config.focus.fly_duration_ms);
        self.uncluster = Some(job);
        self.uncluster_task = Some(
            self.scheduler
                .after_ms(self.config.focus.settle_delay_ms, Task::UnclusterStep),
        );
    }

    fn uncluster_step(&mut self) {
        self.uncluster_task = None;
        let Some(mut job) = self.uncluster.take() else {
            return;
        };
        let clustered = self.index.as_ref().is_some_and(|index| {
            is_clustered_at(
                index,
                job.at,
                job.zoom().round() as i32,
                self.config.hover.hit_epsilon_deg,
            )
        });

        match job.step(clustered) {
            UnclusterStep::Continue { zoom } => {
                self.surface
                    .fly_to(job.at, zoom, self.expansion.fly_duration_ms());
                self.uncluster = Some(job);
                self.uncluster_task = Some(
                    self.scheduler
                        .after_ms(self.config.focus.uncluster_step_ms, Task::UnclusterStep),
                );
            }
            UnclusterStep::Finish { zoom } => {
                self.surface
                    .fly_to(job.at, zoom, self.config.focus.fly_duration_ms);
                self.uncluster_task = Some(self.scheduler.after_ms(
                    self.config.focus.settle_delay_ms,
                    Task::UnclusterFinish { id: job.id },
                ));
            }
        }
    }

    fn activate_cluster(&mut self, cluster: ClusterId, at: LngLat) {
        let Some(index) = self.index.as_ref() else {
            debug!(cluster = %cluster, "cluster activation before index is ready");
            return;
        };
        let plan = self
            .expansion
            .on_activate(index, cluster, at, self.surface.zoom());
        self.surface.fly_to(plan.at, plan.zoom, plan.duration_ms);
        self.scheduler.after_ms(
            plan.duration_ms + PICK_CHECK_SLACK_MS,
            Task::PickCheck { cluster, at },
        );
    }

    fn pick_check(&mut self, cluster: ClusterId, at: LngLat) {
        let Some(index) = self.index.as_ref() else {
            return;
        };
        let Some(leaves) = self.expansion.pick_leaves(
            index,
            cluster,
            at,
            self.surface.zoom(),
            self.config.hover.hit_epsilon_deg,
        ) else {
            return;
        };
        let points = self.points.points();
        let ids: Vec<String> = leaves
            .into_iter()
            .filter_map(|i| points.get(i).map(|p| p.id.clone()))
            .collect();
        debug!(cluster = %cluster, members = ids.len(), "cluster picked");
        self.events.send(EngineEvent::ClusterPicked { ids, at });
    }

    fn reset_viewport(&mut self) {
        let zoom = self.config.initial_zoom(self.surface.is_touch());
        self.tracker.reset(self.config.default_bbox(), zoom);
        self.surface.set_view(self.config.default_center(), zoom);
        self.emitter.clear();
        self.refresh_rendered();
        self.emit_visible();
    }

    fn persist_view(&mut self) {
        let view = PersistedView {
            center: self.surface.center(),
            zoom: self.surface.zoom().min(self.config.max_zoom()),
        };
        if let Err(err) = self.store.save_view(&view) {
            warn!(%err, "could not persist view");
        }
    }

    fn persist_layers(&mut self) {
        if let Err(err) = self.store.save_layers(&self.layers) {
            warn!(%err, "could not persist layer toggles");
        }
    }

    fn shutdown(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        self.pending_build = None;
        self.settle = None;
        self.uncluster = None;
        self.uncluster_task = None;
        self.markers.clear();
        self.shut_down = true;
        debug!(cancelled, "engine shut down");
    }
}
