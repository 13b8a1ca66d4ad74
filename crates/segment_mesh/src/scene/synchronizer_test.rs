use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use web_time::Instant;

use super::*;
use crate::scene::coloring::FixedColoring;
use crate::scene::selection::SelectionSet;
use crate::test_utils::{cell_segment, cells_pyramid, RecordingHandle, CELLS_SPACING};
use crate::types::{Color, LabelId, VoxelInterval};
use crate::volume::{LabelPyramid, LabelVolume};

const TIMEOUT: Duration = Duration::from_secs(10);
const RED: Color = Color::from_rgb(200, 10, 10);
const BLUE: Color = Color::from_rgb(10, 10, 200);

struct Fixture {
  selection: Arc<SelectionSet>,
  coloring: Arc<FixedColoring>,
  surface: RecordingHandle,
  sync: SceneSynchronizer,
}

fn fixture() -> Fixture {
  let selection = Arc::new(SelectionSet::new());
  let coloring = Arc::new(FixedColoring::new(RED));
  let surface = RecordingHandle::new();
  let sync = SceneSynchronizer::new(selection.clone(), coloring.clone(), surface.factory());
  sync.register_source(Arc::new(cells_pyramid()));
  Fixture {
    selection,
    coloring,
    surface,
    sync,
  }
}

impl Fixture {
  fn settle(&self) {
    assert!(self.sync.wait_idle(TIMEOUT), "background tasks did not finish");
  }

  fn enable(&self) {
    self.sync.set_enabled(true).expect("surface available");
    self.settle();
  }

  fn select(&self, segments: &[&Arc<Segment>]) {
    for segment in segments {
      self.selection.select(Arc::clone(segment));
    }
  }
}

fn keys(segments: &[&Arc<Segment>]) -> Vec<SegmentKey> {
  let mut keys: Vec<SegmentKey> = segments.iter().map(|s| s.key.clone()).collect();
  keys.sort();
  keys
}

/// Poll `condition` until it holds or the timeout elapses.
fn eventually(condition: impl Fn() -> bool) -> bool {
  let deadline = Instant::now() + TIMEOUT;
  while Instant::now() < deadline {
    if condition() {
      return true;
    }
    std::thread::sleep(Duration::from_millis(5));
  }
  condition()
}

fn preset_box(segment: &Arc<Segment>, bounding_box: RealBox) -> Arc<Segment> {
  Arc::new(Segment::clone(segment).with_bounding_box(bounding_box))
}

/// Real-world box of label 1 at time point 0 in the cells pyramid.
fn label_one_box() -> RealBox {
  RealBox::new(DVec3::splat(1.0), DVec3::splat(3.5))
}

// =============================================================================
// Membership
// =============================================================================

#[test]
fn test_displayed_set_matches_selection_at_current_time_point() {
  let f = fixture();
  let (a, b, c) = (cell_segment(1, 0), cell_segment(2, 0), cell_segment(1, 1));
  f.select(&[&a, &b, &c]);

  f.enable();
  assert_eq!(f.sync.displayed_keys(), keys(&[&a, &b]));
  assert_eq!(f.surface.content_count(), 2);

  f.sync.switch_time_point(1);
  f.settle();
  assert_eq!(f.sync.current_time_point(), 1);
  assert_eq!(f.sync.displayed_keys(), keys(&[&c]));
  assert_eq!(f.surface.content_count(), 1);
}

#[test]
fn test_random_selection_sequences_keep_display_consistent() {
  let f = fixture();
  let pool = [
    cell_segment(1, 0),
    cell_segment(2, 0),
    cell_segment(1, 1),
    cell_segment(3, 1),
  ];
  let mut rng = StdRng::seed_from_u64(7);
  f.enable();

  for _ in 0..12 {
    let chosen: Vec<Arc<Segment>> = pool
      .iter()
      .filter(|_| rng.random_bool(0.5))
      .cloned()
      .collect();
    f.selection.set_selected(chosen.iter().cloned());
    f.sync.on_selection_changed();
    if rng.random_bool(0.3) {
      f.sync.switch_time_point(rng.random_range(0..2));
    }
    f.settle();

    let time_point = f.sync.current_time_point();
    let mut expected: Vec<SegmentKey> = chosen
      .iter()
      .filter(|s| s.time_point() == time_point)
      .map(|s| s.key.clone())
      .collect();
    expected.sort();

    assert_eq!(f.sync.displayed_keys(), expected);
    assert_eq!(f.surface.content_count(), expected.len());
  }
}

#[test]
fn test_deselected_segment_is_pruned() {
  let f = fixture();
  let (a, b) = (cell_segment(1, 0), cell_segment(2, 0));
  f.select(&[&a, &b]);
  f.enable();

  f.selection.deselect(&b.key);
  assert!(f.sync.on_selection_changed().is_some());
  f.settle();

  assert_eq!(f.sync.displayed_keys(), keys(&[&a]));
  assert_eq!(f.surface.content_count(), 1);
  // Geometry outlives the content
  assert!(f.sync.cached_geometry(&b.key).is_some());
}

#[test]
fn test_selection_change_while_disabled_is_ignored() {
  let f = fixture();
  f.select(&[&cell_segment(1, 0)]);

  assert!(f.sync.on_selection_changed().is_none());
  assert!(f.sync.displayed_keys().is_empty());
  assert_eq!(f.surface.surfaces_created(), 0);
}

#[test]
fn test_content_mapping_is_bidirectional() {
  let f = fixture();
  let a = cell_segment(1, 0);
  f.select(&[&a]);
  f.enable();

  let handle = f.sync.content_of(&a.key).expect("content for selected segment");
  assert_eq!(f.sync.segment_of(handle), Some(a.key.clone()));
}

// =============================================================================
// Caching and recomputation
// =============================================================================

#[test]
fn test_reconcile_twice_does_no_new_work() {
  let f = fixture();
  f.select(&[&cell_segment(1, 0), &cell_segment(2, 0)]);
  f.enable();

  let displayed = f.sync.displayed_keys();
  let handles: Vec<_> = displayed.iter().map(|k| f.sync.content_of(k)).collect();
  let before = f.sync.stats();
  assert_eq!(before.extractions, 2);
  assert_eq!(before.flood_fills, 2);

  f.sync.reconcile(false);
  f.sync.reconcile(false);

  let after = f.sync.stats();
  assert_eq!(f.sync.displayed_keys(), displayed);
  let handles_after: Vec<_> = displayed.iter().map(|k| f.sync.content_of(k)).collect();
  assert_eq!(handles_after, handles);
  assert_eq!(after.extractions, before.extractions);
  assert_eq!(after.flood_fills, before.flood_fills);
}

#[test]
fn test_preset_bounding_box_skips_flood_fill_unless_forced() {
  let f = fixture();
  let a = preset_box(&cell_segment(1, 0), label_one_box());
  f.select(&[&a]);
  f.enable();

  let stats = f.sync.stats();
  assert_eq!(stats.flood_fills, 0);
  assert_eq!(stats.extractions, 1);
  assert_eq!(f.sync.displayed_keys(), keys(&[&a]));

  f.sync.reconcile(true);

  let stats = f.sync.stats();
  assert_eq!(stats.flood_fills, 1);
  assert_eq!(stats.extractions, 2);
  // The flood fill finds the same block
  assert_eq!(f.sync.cached_bounding_box(&a.key), Some(label_one_box()));
}

#[test]
fn test_forced_recompute_extracts_every_time() {
  let f = fixture();
  let a = cell_segment(1, 0);
  f.select(&[&a]);
  f.enable();
  let first = f.sync.cached_geometry(&a.key).expect("geometry cached");

  f.sync.reconcile(true);
  f.sync.reconcile(true);

  assert_eq!(f.sync.stats().extractions, 3);
  assert_eq!(f.sync.displayed_keys(), keys(&[&a]));
  assert_eq!(f.surface.content_count(), 1);
  let last = f.sync.cached_geometry(&a.key).expect("geometry cached");
  assert!(!Arc::ptr_eq(&first, &last));
  assert_eq!(first.triangle_count(), last.triangle_count());
}

#[test]
fn test_absent_label_adds_no_content() {
  let f = fixture();
  let missing = preset_box(&cell_segment(9, 0), label_one_box());
  f.select(&[&missing]);
  f.enable();

  assert!(f.sync.displayed_keys().is_empty());
  assert_eq!(f.surface.content_count(), 0);
  let stats = f.sync.stats();
  assert_eq!(stats.empty_results, 1);
  assert_eq!(stats.failures, 0);
  assert!(f
    .sync
    .cached_geometry(&missing.key)
    .is_some_and(|g| g.is_empty()));

  // Empty results are cached as well
  f.sync.reconcile(false);
  assert_eq!(f.sync.stats().extractions, 1);
}

#[test]
fn test_background_anchor_yields_nothing_to_display() {
  let f = fixture();
  let stray = cell_segment(9, 0);
  f.select(&[&stray]);
  f.enable();

  assert!(f.sync.displayed_keys().is_empty());
  assert_eq!(f.sync.stats().empty_results, 1);
  assert_eq!(
    f.sync.cached_bounding_box(&stray.key),
    Some(RealBox::new(DVec3::ZERO, DVec3::splat(23.0 * 0.5)))
  );
}

#[test]
fn test_discard_segment_drops_content_and_cache() {
  let f = fixture();
  let a = cell_segment(1, 0);
  f.select(&[&a]);
  f.enable();

  f.sync.discard_segment(&a.key);
  assert!(f.sync.displayed_keys().is_empty());
  assert!(f.sync.cached_geometry(&a.key).is_none());
  assert!(f.sync.cached_bounding_box(&a.key).is_none());

  f.sync.reconcile(false);
  assert_eq!(f.sync.stats().extractions, 2);
  assert_eq!(f.sync.stats().flood_fills, 2);
}

// =============================================================================
// Presentation
// =============================================================================

#[test]
fn test_new_content_is_named_colored_transparent_and_locked() {
  let f = fixture();
  f.sync
    .set_config(
      ViewConfig::default()
        .with_content_name_prefix("nuclei")
        .with_transparency(0.3),
    )
    .expect("valid config");
  f.select(&[&cell_segment(1, 0)]);
  f.enable();

  assert_eq!(f.surface.names(), vec!["nuclei_1".to_string()]);
  let recording = f.surface.lock();
  let content = recording.contents.values().next().expect("one content");
  assert_eq!(content.color, RED);
  assert_eq!(content.transparency, 0.3);
  assert!(content.locked);
  assert!(content.triangles > 0);
  assert_eq!(recording.auto_adjust_view, Some(false));
}

#[test]
fn test_coloring_change_recolors_without_rebuilding() {
  let f = fixture();
  let (a, b) = (cell_segment(1, 0), cell_segment(2, 0));
  f.select(&[&a, &b]);
  f.enable();
  let geometry = f.sync.cached_geometry(&a.key).expect("geometry cached");
  let displayed = f.sync.displayed_keys();
  let before = f.sync.stats();

  f.coloring.set(BLUE);
  f.sync.on_coloring_changed();
  f.settle();

  assert_eq!(f.surface.colors(), vec![BLUE, BLUE]);
  assert_eq!(f.sync.displayed_keys(), displayed);
  assert_eq!(f.sync.stats(), before);
  let after = f.sync.cached_geometry(&a.key).expect("geometry cached");
  assert!(Arc::ptr_eq(&geometry, &after));
}

#[test]
fn test_config_changes_apply_to_next_reconciliation() {
  let f = fixture();
  f.select(&[&cell_segment(1, 0)]);
  f.enable();
  assert_eq!(f.surface.names(), vec!["_1".to_string()]);

  f.sync
    .update_config(|config| config.content_name_prefix = "cells".into())
    .expect("valid config");
  f.sync.reconcile(true);

  assert_eq!(f.surface.names(), vec!["cells_1".to_string()]);
}

#[test]
fn test_invalid_config_is_rejected() {
  let f = fixture();
  let err = f
    .sync
    .set_config(ViewConfig::default().with_transparency(2.0))
    .expect_err("transparency out of range");

  assert!(err.is_configuration_error());
  assert_eq!(f.sync.config(), ViewConfig::default());
}

// =============================================================================
// Focus
// =============================================================================

#[test]
fn test_repeated_focus_animates_once() {
  let f = fixture();
  let (a, b) = (cell_segment(1, 0), cell_segment(2, 0));
  f.select(&[&a, &b]);
  f.enable();

  assert!(f.sync.on_focus(Arc::clone(&a)).is_none());
  f.sync.on_focus(Arc::clone(&a));
  assert_eq!(f.surface.animation_count(), 1);

  f.sync.on_focus(Arc::clone(&b));
  f.sync.on_focus(Arc::clone(&a));
  assert_eq!(f.surface.animation_count(), 3);

  let recording = f.surface.lock();
  let (handle, animation) = recording.animations[0];
  assert_eq!(Some(handle), f.sync.content_of(&a.key));
  assert_eq!(animation, ViewConfig::default().focus_animation());
}

#[test]
fn test_focus_on_other_time_point_switches_scene() {
  let f = fixture();
  let (now, later) = (cell_segment(1, 0), cell_segment(1, 1));
  f.select(&[&now, &later]);
  f.enable();
  assert_eq!(f.sync.displayed_keys(), keys(&[&now]));

  assert!(f.sync.on_focus(Arc::clone(&later)).is_some());
  // Not displayed yet: no animation
  assert_eq!(f.surface.animation_count(), 0);
  f.settle();

  assert_eq!(f.sync.current_time_point(), 1);
  assert_eq!(f.sync.displayed_keys(), keys(&[&later]));

  f.sync.on_focus(Arc::clone(&later));
  assert_eq!(f.surface.animation_count(), 1);
}

#[test]
fn test_focus_while_disabled_is_ignored() {
  let f = fixture();
  let later = cell_segment(1, 1);

  assert!(f.sync.on_focus(later).is_none());
  f.settle();
  assert_eq!(f.sync.current_time_point(), 0);
}

#[test]
fn test_refocus_after_content_returns_animates_again() {
  let f = fixture();
  let a = cell_segment(1, 0);
  f.select(&[&a]);
  f.enable();
  f.sync.on_focus(Arc::clone(&a));

  f.selection.deselect(&a.key);
  f.sync.on_selection_changed();
  f.settle();
  f.selection.select(Arc::clone(&a));
  f.sync.on_selection_changed();
  f.settle();

  f.sync.on_focus(Arc::clone(&a));
  assert_eq!(f.surface.animation_count(), 2);
}

// =============================================================================
// Enable, disable, close
// =============================================================================

#[test]
fn test_disable_removes_content_and_keeps_cache() {
  let f = fixture();
  f.select(&[&cell_segment(1, 0), &cell_segment(2, 0)]);
  f.enable();
  assert_eq!(f.surface.content_count(), 2);

  assert!(f.sync.set_enabled(false).expect("disable").is_some());
  f.settle();
  assert!(f.sync.displayed_keys().is_empty());
  assert_eq!(f.surface.content_count(), 0);

  f.enable();
  assert_eq!(f.sync.displayed_keys().len(), 2);
  let stats = f.sync.stats();
  assert_eq!(stats.extractions, 2);
  assert_eq!(stats.cache_hits, 2);
  assert_eq!(f.surface.surfaces_created(), 1);
}

#[test]
fn test_enable_twice_schedules_once() {
  let f = fixture();
  assert!(f.sync.set_enabled(true).expect("enable").is_some());
  assert!(f.sync.set_enabled(true).expect("enable").is_none());
  f.settle();
  assert!(f.sync.is_enabled());
}

#[test]
fn test_close_is_disable() {
  let f = fixture();
  f.select(&[&cell_segment(1, 0)]);
  f.enable();

  let task = f.sync.close().expect("disable never fails");
  assert!(task.is_some());
  assert!(f.sync.close().expect("already closed").is_none());
  f.settle();

  assert!(!f.sync.is_enabled());
  assert_eq!(f.surface.content_count(), 0);
}

#[test]
fn test_surface_closed_externally_clears_state() {
  let f = fixture();
  let a = cell_segment(1, 0);
  f.select(&[&a]);
  f.enable();

  f.surface.close();

  assert!(!f.sync.is_enabled());
  assert!(f.sync.displayed_keys().is_empty());

  f.enable();
  assert_eq!(f.surface.surfaces_created(), 2);
  assert_eq!(f.sync.displayed_keys(), keys(&[&a]));
}

#[test]
fn test_surface_factory_failure_is_reported() {
  let selection = Arc::new(SelectionSet::new());
  let sync = SceneSynchronizer::new(
    selection,
    Arc::new(FixedColoring::new(RED)),
    || -> Result<Box<dyn RenderSurface>> { Err(MeshError::SurfaceUnavailable("no display".into())) },
  );

  let err = sync.set_enabled(true).expect_err("factory fails");
  assert!(matches!(err, MeshError::SurfaceUnavailable(_)));
  assert!(!sync.is_enabled());
}

// =============================================================================
// Failure isolation
// =============================================================================

struct ExplodingVolume;

impl LabelVolume for ExplodingVolume {
  fn extent(&self) -> VoxelInterval {
    VoxelInterval::from_dimensions([10, 10, 10])
  }

  fn label_at(&self, _voxel: [i64; 3]) -> LabelId {
    panic!("corrupt block")
  }
}

struct ExplodingSource;

impl VolumeSource for ExplodingSource {
  fn name(&self) -> &str {
    "broken"
  }

  fn num_levels(&self) -> usize {
    1
  }

  fn spacing(&self, level: usize) -> Option<DVec3> {
    (level == 0).then_some(DVec3::ONE)
  }

  fn is_present(&self, _time_point: u32, level: usize) -> bool {
    level == 0
  }

  fn volume(&self, _time_point: u32, level: usize) -> Option<Arc<dyn LabelVolume>> {
    (level == 0).then(|| Arc::new(ExplodingVolume) as Arc<dyn LabelVolume>)
  }
}

#[test]
fn test_failures_do_not_disturb_other_segments() {
  let f = fixture();
  f.sync.register_source(Arc::new(ExplodingSource));
  let good = cell_segment(1, 0);
  f.select(&[&good]);
  f.enable();
  let handle = f.sync.content_of(&good.key);

  let unmapped = Arc::new(Segment::new("elsewhere", 4, 0, DVec3::ZERO));
  let exploding = Arc::new(
    Segment::new("broken", 1, 0, DVec3::ONE)
      .with_bounding_box(RealBox::new(DVec3::ZERO, DVec3::splat(5.0))),
  );
  let fresh = cell_segment(2, 0);
  f.select(&[&unmapped, &exploding, &fresh]);
  f.sync.reconcile(false);

  assert_eq!(f.sync.displayed_keys(), keys(&[&good, &fresh]));
  assert_eq!(f.sync.content_of(&good.key), handle);
  assert_eq!(f.sync.stats().failures, 2);
  assert!(f.sync.cached_geometry(&exploding.key).is_none());
}

#[test]
fn test_flood_fill_fault_does_not_stop_reconciliation() {
  let f = fixture();
  f.sync.register_source(Arc::new(ExplodingSource));
  let stale = cell_segment(2, 0);
  f.select(&[&stale]);
  f.enable();
  assert_eq!(f.sync.displayed_keys(), keys(&[&stale]));

  // No box, so the build starts with a flood fill on the exploding volume
  let corrupt = Arc::new(Segment::new("broken", 1, 0, DVec3::ONE));
  let good = cell_segment(1, 0);
  f.selection.deselect(&stale.key);
  f.select(&[&corrupt, &good]);
  f.sync.reconcile(false);

  assert_eq!(f.sync.displayed_keys(), keys(&[&good]));
  assert_eq!(f.surface.content_count(), 1);
  assert_eq!(f.sync.stats().failures, 1);
  assert!(f.sync.cached_bounding_box(&corrupt.key).is_none());
}

// =============================================================================
// In-flight builds
// =============================================================================

/// Image `gated`: the cells pyramid behind volumes whose reads block until
/// every gate sender is dropped. The first read reports on `entered`.
struct GatedSource {
  inner: LabelPyramid,
  gate: Receiver<()>,
  entered: Sender<()>,
}

struct GatedVolume {
  inner: Arc<dyn LabelVolume>,
  gate: Receiver<()>,
  entered: Sender<()>,
}

impl LabelVolume for GatedVolume {
  fn extent(&self) -> VoxelInterval {
    self.inner.extent()
  }

  fn label_at(&self, voxel: [i64; 3]) -> LabelId {
    let _ = self.entered.try_send(());
    let _ = self.gate.recv();
    self.inner.label_at(voxel)
  }
}

impl VolumeSource for GatedSource {
  fn name(&self) -> &str {
    "gated"
  }

  fn num_levels(&self) -> usize {
    self.inner.num_levels()
  }

  fn spacing(&self, level: usize) -> Option<DVec3> {
    self.inner.spacing(level)
  }

  fn is_present(&self, time_point: u32, level: usize) -> bool {
    self.inner.is_present(time_point, level)
  }

  fn volume(&self, time_point: u32, level: usize) -> Option<Arc<dyn LabelVolume>> {
    let inner = self.inner.volume(time_point, level)?;
    Some(Arc::new(GatedVolume {
      inner,
      gate: self.gate.clone(),
      entered: self.entered.clone(),
    }))
  }
}

/// Register a gated source; returns the gate (drop it to release builds)
/// and the channel signalling that a build is blocked.
fn register_gated(f: &Fixture) -> (Sender<()>, Receiver<()>) {
  let (release, gate) = unbounded();
  let (entered_tx, entered) = bounded(1);
  f.sync.register_source(Arc::new(GatedSource {
    inner: cells_pyramid(),
    gate,
    entered: entered_tx,
  }));
  (release, entered)
}

/// Label 1 of the gated image at time point 0.
fn gated_segment() -> Arc<Segment> {
  Arc::new(Segment::new("gated", 1, 0, DVec3::splat(4.0 * CELLS_SPACING)))
}

#[test]
fn test_deselect_during_build_is_pruned_after_publish() {
  let f = fixture();
  let (release, entered) = register_gated(&f);
  f.enable();

  let gated = gated_segment();
  let other = cell_segment(2, 0);
  f.select(&[&gated, &other]);
  f.sync.on_selection_changed();
  entered.recv_timeout(TIMEOUT).expect("gated build started");

  f.selection.deselect(&gated.key);
  f.sync.reconcile(false);
  assert_eq!(f.sync.displayed_keys(), keys(&[&other]));

  drop(release);
  f.settle();

  assert_eq!(f.sync.displayed_keys(), keys(&[&other]));
  assert_eq!(f.surface.content_count(), 1);
  assert!(f.sync.cached_geometry(&gated.key).is_some());
}

#[test]
fn test_time_switch_during_build_rejects_publish() {
  let f = fixture();
  let (release, entered) = register_gated(&f);
  f.enable();

  let gated = gated_segment();
  f.select(&[&gated]);
  f.sync.on_selection_changed();
  entered.recv_timeout(TIMEOUT).expect("gated build started");

  f.sync.switch_to(1);
  assert_eq!(f.sync.current_time_point(), 1);

  drop(release);
  f.settle();

  assert!(f.sync.displayed_keys().is_empty());
  assert_eq!(f.surface.content_count(), 0);
  assert!(f.sync.cached_geometry(&gated.key).is_some());
  let extractions = f.sync.stats().extractions;

  // Returning to the build's time point shows it from the cache
  f.sync.switch_time_point(0);
  f.settle();
  assert_eq!(f.sync.displayed_keys(), keys(&[&gated]));
  assert_eq!(f.sync.stats().extractions, extractions);
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn test_listen_dispatches_typed_events() {
  let f = fixture();
  let (a, b) = (cell_segment(1, 0), cell_segment(1, 1));
  f.select(&[&a, &b]);
  f.sync.set_enabled(true).expect("surface available");
  f.settle();

  let (tx, rx) = crossbeam_channel::unbounded();
  let listener = f.sync.listen(rx).expect("listener thread");
  tx.send(SceneEvent::Focus(Arc::clone(&b))).expect("send");
  f.coloring.set(BLUE);
  tx.send(SceneEvent::ColoringChanged).expect("send");
  drop(tx);
  listener.join().expect("listener exits when the channel closes");
  f.settle();

  assert_eq!(f.sync.current_time_point(), 1);
  assert_eq!(f.sync.displayed_keys(), keys(&[&b]));
  assert_eq!(f.surface.colors(), vec![BLUE]);
}

#[test]
fn test_selection_set_subscription_drives_scene() {
  let f = fixture();
  f.enable();
  let _listener = f.sync.listen(f.selection.subscribe()).expect("listener thread");

  let a = cell_segment(2, 0);
  f.selection.select(Arc::clone(&a));

  assert!(eventually(|| f.sync.displayed_keys() == keys(&[&a])));
  f.selection.clear();
  assert!(eventually(|| f.sync.displayed_keys().is_empty()));
}
