//! Keeps render surface content in agreement with the selection.
//!
//! ```text
//!  selection / coloring / focus / enable events (caller context, non-blocking)
//!                               │
//!                               ▼  TaskPool::spawn
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ PHASE 1  for each selected segment                              │
//! │   other time point  → remove content                            │
//! │   force             → remove content, rebuild                   │
//! │   no content        → cache lookup ─► build (lock released)     │
//! │                       ─► store + add content (lock re-acquired) │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ PHASE 2  remove content of segments no longer selected          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All mutable state (content mapping, enabled flag, time point, focus
//! marker, config, mesh cache, volume sources) lives behind one mutex. Mesh
//! builds run without it and re-acquire it to publish. In-flight builds are
//! never cancelled: a segment deselected mid-build is still published and
//! the next reconciliation prunes it.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, error, info};

use super::coloring::ColoringModel;
use super::selection::{SceneEvent, SelectionModel};
use super::surface::{ContentHandle, RenderSurface, SurfaceFactory};
use crate::config::ViewConfig;
use crate::error::{MeshError, Result};
use crate::mesh_cache::{Lookup, MeshCache, MeshSettings};
use crate::stats::{StatsSnapshot, SyncStats};
use crate::threading::{panic_message, TaskId, TaskPool};
use crate::types::{MeshGeometry, RealBox, Segment, SegmentKey};
use crate::volume::VolumeSource;

/// Content shown for one segment.
struct DisplayedContent {
  handle: ContentHandle,
  segment: Arc<Segment>,
}

struct SyncState {
  surface: Option<Box<dyn RenderSurface>>,
  displayed: HashMap<SegmentKey, DisplayedContent>,
  segments_by_handle: HashMap<ContentHandle, SegmentKey>,
  enabled: bool,
  current_time_point: u32,
  recent_focus: Option<SegmentKey>,
  config: ViewConfig,
  cache: MeshCache,
  sources: HashMap<String, Arc<dyn VolumeSource>>,
}

impl SyncState {
  fn new(config: ViewConfig) -> Self {
    Self {
      surface: None,
      displayed: HashMap::new(),
      segments_by_handle: HashMap::new(),
      enabled: false,
      current_time_point: 0,
      recent_focus: None,
      config,
      cache: MeshCache::new(),
      sources: HashMap::new(),
    }
  }

  fn remove_content(&mut self, key: &SegmentKey) -> bool {
    let Some(content) = self.displayed.remove(key) else {
      return false;
    };
    self.segments_by_handle.remove(&content.handle);
    if let Some(surface) = self.surface.as_mut() {
      surface.remove_content(content.handle);
    }
    if self.recent_focus.as_ref() == Some(key) {
      self.recent_focus = None;
    }
    true
  }

  fn remove_all(&mut self) {
    let keys: Vec<SegmentKey> = self.displayed.keys().cloned().collect();
    for key in &keys {
      self.remove_content(key);
    }
  }

  /// Whether content for `segment` may be added right now.
  fn accepts(&self, segment: &Segment) -> bool {
    self.enabled
      && self.surface.is_some()
      && segment.time_point() == self.current_time_point
      && !self.displayed.contains_key(&segment.key)
  }

  /// Add content for a segment: named `<prefix>_<label>`, colored,
  /// transparent per config, locked. Empty geometry is not shown.
  fn present(
    &mut self,
    segment: &Arc<Segment>,
    geometry: &MeshGeometry,
    coloring: &dyn ColoringModel,
  ) -> Result<()> {
    if geometry.is_empty() {
      debug!(segment = %segment.key, "empty geometry; segment not displayed");
      return Ok(());
    }
    let Some(surface) = self.surface.as_mut() else {
      return Ok(());
    };

    let name = format!("{}_{}", self.config.content_name_prefix, segment.label_id());
    let handle = surface.add_mesh(&name, geometry, coloring.color_of(segment))?;
    surface.set_transparency(handle, self.config.transparency);
    surface.set_locked(handle, true);
    surface.set_auto_adjust_view(false);

    self.segments_by_handle.insert(handle, segment.key.clone());
    self.displayed.insert(
      segment.key.clone(),
      DisplayedContent {
        handle,
        segment: Arc::clone(segment),
      },
    );
    Ok(())
  }
}

struct Shared {
  state: Mutex<SyncState>,
  selection: Arc<dyn SelectionModel>,
  coloring: Arc<dyn ColoringModel>,
  factory: Box<dyn SurfaceFactory>,
  pool: TaskPool,
  stats: SyncStats,
}

/// Reconciles a render surface against a selection model.
///
/// Cheap to clone; clones drive the same scene. Event handlers return
/// immediately and do their work on the internal task pool.
#[derive(Clone)]
pub struct SceneSynchronizer {
  shared: Arc<Shared>,
}

impl SceneSynchronizer {
  pub fn new(
    selection: Arc<dyn SelectionModel>,
    coloring: Arc<dyn ColoringModel>,
    factory: impl SurfaceFactory + 'static,
  ) -> Self {
    Self {
      shared: Arc::new(Shared {
        state: Mutex::new(SyncState::new(ViewConfig::default())),
        selection,
        coloring,
        factory: Box::new(factory),
        pool: TaskPool::new(),
        stats: SyncStats::new(),
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, SyncState> {
    self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn spawn(&self, work: impl FnOnce(SceneSynchronizer) + Send + 'static) -> TaskId {
    let this = self.clone();
    self.shared.pool.spawn(move || work(this))
  }

  // ===========================================================================
  // Setup
  // ===========================================================================

  /// Register the volume source segments of image `source.name()` read from.
  pub fn register_source(&self, source: Arc<dyn VolumeSource>) {
    let name = source.name().to_string();
    self.lock().sources.insert(name, source);
  }

  pub fn config(&self) -> ViewConfig {
    self.lock().config.clone()
  }

  /// Replace the configuration; effective on the next reconciliation.
  pub fn set_config(&self, config: ViewConfig) -> Result<()> {
    if let Err(err) = config.validate() {
      error!(%err, "rejected view configuration");
      return Err(err);
    }
    self.lock().config = config;
    Ok(())
  }

  /// Edit the configuration in place, rejecting invalid results.
  pub fn update_config(&self, edit: impl FnOnce(&mut ViewConfig)) -> Result<()> {
    let mut config = self.config();
    edit(&mut config);
    self.set_config(config)
  }

  // ===========================================================================
  // Enable / disable
  // ===========================================================================

  /// Show or hide the scene.
  ///
  /// Enabling without a surface creates one and registers a teardown hook
  /// that clears all scene state and disables when the surface is closed.
  /// Transitions schedule a full reconciliation (enable) or the removal of
  /// all content (disable); the task id is returned.
  pub fn set_enabled(&self, enabled: bool) -> Result<Option<TaskId>> {
    let mut state = self.lock();

    if enabled && state.surface.is_none() {
      let mut surface = self.shared.factory.create().map_err(|err| {
        error!(%err, "could not create render surface");
        err
      })?;
      let weak = Arc::downgrade(&self.shared);
      surface.on_close(Box::new(move || {
        if let Some(shared) = weak.upgrade() {
          SceneSynchronizer { shared }.surface_closed();
        }
      }));
      state.surface = Some(surface);
    }

    if state.enabled == enabled {
      return Ok(None);
    }
    state.enabled = enabled;
    drop(state);

    let task = if enabled {
      self.spawn(|this| this.reconcile(false))
    } else {
      self.spawn(|this| {
        let mut state = this.lock();
        if !state.enabled {
          state.remove_all();
        }
      })
    };
    Ok(Some(task))
  }

  pub fn is_enabled(&self) -> bool {
    self.lock().enabled
  }

  /// Same as `set_enabled(false)`.
  pub fn close(&self) -> Result<Option<TaskId>> {
    self.set_enabled(false)
  }

  fn surface_closed(&self) {
    let mut state = self.lock();
    info!(displayed = state.displayed.len(), "render surface closed; clearing scene");
    state.surface = None;
    state.displayed.clear();
    state.segments_by_handle.clear();
    state.recent_focus = None;
    state.enabled = false;
  }

  // ===========================================================================
  // Reconciliation
  // ===========================================================================

  /// Bring the displayed content in line with the selection and current
  /// time point. Blocks while meshes are built.
  pub fn reconcile(&self, force_recompute: bool) {
    let selected = self.shared.selection.selected();
    for segment in &selected {
      let updated = catch_unwind(AssertUnwindSafe(|| self.update_segment(segment, force_recompute)));
      if let Err(panic) = updated {
        self.report(
          &segment.key,
          &MeshError::ExtractionPanicked {
            segment: segment.key.clone(),
            message: panic_message(&*panic),
          },
        );
      }
    }
    self.prune_unselected();
  }

  fn update_segment(&self, segment: &Arc<Segment>, force: bool) {
    let key = &segment.key;

    let (request, source, settings) = {
      let mut state = self.lock();
      if !state.enabled || state.surface.is_none() {
        return;
      }
      if segment.time_point() != state.current_time_point {
        state.remove_content(key);
        return;
      }
      if force {
        state.remove_content(key);
      }
      if state.displayed.contains_key(key) {
        return;
      }

      match state.cache.prepare(segment, force) {
        Lookup::Cached(geometry) => {
          self.shared.stats.record_cache_hit();
          if let Err(err) = state.present(segment, &geometry, &*self.shared.coloring) {
            self.report(key, &err);
          }
          return;
        }
        Lookup::Build(request) => {
          let Some(source) = state.sources.get(segment.image_id()).cloned() else {
            self.report(
              key,
              &MeshError::MissingSource {
                segment: key.clone(),
                image_id: segment.image_id().to_string(),
              },
            );
            return;
          };
          (request, source, MeshSettings::from(&state.config))
        }
      }
    };

    let build = request.build(&*source, &settings, &self.shared.stats);

    let mut state = self.lock();
    match state.cache.store(build) {
      Ok(geometry) => {
        if state.accepts(segment) {
          if let Err(err) = state.present(segment, &geometry, &*self.shared.coloring) {
            self.report(key, &err);
          }
        }
      }
      Err(err) => self.report(key, &err),
    }
  }

  fn prune_unselected(&self) {
    let selected: HashSet<SegmentKey> = self
      .shared
      .selection
      .selected()
      .iter()
      .map(|s| s.key.clone())
      .collect();

    let mut state = self.lock();
    let stale: Vec<SegmentKey> = state
      .displayed
      .keys()
      .filter(|key| !selected.contains(*key))
      .cloned()
      .collect();
    for key in &stale {
      state.remove_content(key);
    }
  }

  fn report(&self, key: &SegmentKey, err: &MeshError) {
    self.shared.stats.record_failure();
    if err.is_configuration_error() {
      error!(segment = %key, %err, "configuration error; segment not displayed");
    } else {
      error!(segment = %key, %err, "could not build segment mesh");
    }
  }

  // ===========================================================================
  // Events
  // ===========================================================================

  /// Selection changed: reconcile in the background unless disabled.
  pub fn on_selection_changed(&self) -> Option<TaskId> {
    if !self.is_enabled() {
      return None;
    }
    Some(self.spawn(|this| this.reconcile(false)))
  }

  /// Coloring changed: recolor every displayed content. Membership and
  /// geometry are untouched.
  pub fn on_coloring_changed(&self) -> TaskId {
    self.spawn(|this| {
      let coloring = Arc::clone(&this.shared.coloring);
      let mut state = this.lock();
      let SyncState {
        surface, displayed, ..
      } = &mut *state;
      let Some(surface) = surface.as_mut() else {
        return;
      };
      for content in displayed.values() {
        surface.set_color(content.handle, coloring.color_of(&content.segment));
      }
    })
  }

  /// Focus a segment.
  ///
  /// A segment of another time point switches the scene to that time point
  /// in the background. Independently, if the segment's content is shown and
  /// it is not already the most recent focus, the camera is animated towards
  /// it. Returns the time-point switch task, if any.
  pub fn on_focus(&self, segment: Arc<Segment>) -> Option<TaskId> {
    let mut state = self.lock();
    if !state.enabled {
      return None;
    }

    let time_point = segment.time_point();
    let switch = (time_point != state.current_time_point)
      .then(|| self.spawn(move |this| this.switch_to(time_point)));

    let SyncState {
      surface,
      displayed,
      recent_focus,
      config,
      ..
    } = &mut *state;
    let Some(surface) = surface.as_mut() else {
      return switch;
    };
    if surface.content_count() == 0 || recent_focus.as_ref() == Some(&segment.key) {
      return switch;
    }
    let Some(content) = displayed.get(&segment.key) else {
      return switch;
    };

    *recent_focus = Some(segment.key.clone());
    debug!(segment = %segment.key, "animating camera focus");
    surface.animate_focus(content.handle, &config.focus_animation());

    switch
  }

  /// Switch the current time point in the background and reconcile.
  pub fn switch_time_point(&self, time_point: u32) -> TaskId {
    self.spawn(move |this| this.switch_to(time_point))
  }

  fn switch_to(&self, time_point: u32) {
    {
      let mut state = self.lock();
      if state.current_time_point == time_point {
        return;
      }
      debug!(from = state.current_time_point, to = time_point, "switching time point");
      state.current_time_point = time_point;
    }
    self.reconcile(false);
  }

  /// Dispatch one typed event.
  pub fn handle_event(&self, event: SceneEvent) {
    match event {
      SceneEvent::SelectionChanged => {
        self.on_selection_changed();
      }
      SceneEvent::ColoringChanged => {
        self.on_coloring_changed();
      }
      SceneEvent::Focus(segment) => {
        self.on_focus(segment);
      }
    }
  }

  /// Dispatch events from `events` on a dedicated thread until every sender
  /// is dropped.
  pub fn listen(&self, events: Receiver<SceneEvent>) -> std::io::Result<JoinHandle<()>> {
    let this = self.clone();
    std::thread::Builder::new()
      .name("scene-events".into())
      .spawn(move || {
        for event in events.iter() {
          this.handle_event(event);
        }
        debug!("scene event stream closed");
      })
  }

  // ===========================================================================
  // Segment lifecycle and inspection
  // ===========================================================================

  /// Forget a segment the owner destroyed: its content, bounding box and
  /// geometry.
  pub fn discard_segment(&self, key: &SegmentKey) {
    let mut state = self.lock();
    state.remove_content(key);
    state.cache.forget(key);
  }

  pub fn current_time_point(&self) -> u32 {
    self.lock().current_time_point
  }

  /// Keys of displayed segments, sorted.
  pub fn displayed_keys(&self) -> Vec<SegmentKey> {
    let mut keys: Vec<SegmentKey> = self.lock().displayed.keys().cloned().collect();
    keys.sort();
    keys
  }

  pub fn content_of(&self, key: &SegmentKey) -> Option<ContentHandle> {
    self.lock().displayed.get(key).map(|c| c.handle)
  }

  pub fn segment_of(&self, handle: ContentHandle) -> Option<SegmentKey> {
    self.lock().segments_by_handle.get(&handle).cloned()
  }

  pub fn cached_geometry(&self, key: &SegmentKey) -> Option<Arc<MeshGeometry>> {
    self.lock().cache.geometry(key)
  }

  pub fn cached_bounding_box(&self, key: &SegmentKey) -> Option<RealBox> {
    self.lock().cache.bounding_box(key)
  }

  pub fn stats(&self) -> StatsSnapshot {
    self.shared.stats.snapshot()
  }

  /// Block until all background work finished or `timeout` elapsed.
  pub fn wait_idle(&self, timeout: Duration) -> bool {
    self.shared.pool.wait_idle(timeout)
  }
}

#[cfg(test)]
#[path = "synchronizer_test.rs"]
mod synchronizer_test;
