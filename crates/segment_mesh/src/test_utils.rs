//! Fixtures shared by unit tests: label volumes, a labeled pyramid with
//! segments, and a render surface that records every call.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::DVec3;

use crate::config::FocusAnimation;
use crate::error::Result;
use crate::scene::surface::{CloseHook, ContentHandle, RenderSurface, SurfaceFactory};
use crate::types::{Color, LabelId, MeshGeometry, Segment};
use crate::volume::{DenseLabelVolume, LabelPyramid};

// =============================================================================
// Volumes
// =============================================================================

/// Background volume with one inclusive block of `label`.
pub fn block_volume(dims: [usize; 3], min: [usize; 3], max: [usize; 3], label: LabelId) -> DenseLabelVolume {
  let mut volume = DenseLabelVolume::new(dims);
  volume.fill_block(min, max, label);
  volume
}

/// Background volume with a voxelized ball of `label` (voxel centers within
/// `radius` of `center`).
pub fn sphere_volume(dims: [usize; 3], center: [f64; 3], radius: f64, label: LabelId) -> DenseLabelVolume {
  let center = DVec3::from_array(center);
  DenseLabelVolume::from_fn(dims, |[x, y, z]| {
    let p = DVec3::new(x as f64, y as f64, z as f64);
    if p.distance(center) <= radius {
      label
    } else {
      0
    }
  })
}

/// Voxel spacing of level 0 in [`cells_pyramid`].
pub const CELLS_SPACING: f64 = 0.5;

/// Image `cells`: 24³ voxels at spacing 0.5 plus one 2× downsampled level.
///
/// Time point 0: label 1 block [2, 7]³, label 2 ball at 16 radius 4.
/// Time point 1: label 1 block [4, 9]³, label 3 block [12, 18]³.
pub fn cells_pyramid() -> LabelPyramid {
  let mut t0 = block_volume([24, 24, 24], [2, 2, 2], [7, 7, 7], 1);
  let ball = sphere_volume([24, 24, 24], [16.0, 16.0, 16.0], 4.0, 2);
  for z in 0..24 {
    for y in 0..24 {
      for x in 0..24 {
        if ball.get(x, y, z) == 2 {
          t0.set(x, y, z, 2);
        }
      }
    }
  }

  let mut t1 = block_volume([24, 24, 24], [4, 4, 4], [9, 9, 9], 1);
  t1.fill_block([12, 12, 12], [18, 18, 18], 3);

  LabelPyramid::with_downsampled_levels(
    "cells",
    DVec3::splat(CELLS_SPACING),
    &[[2, 2, 2]],
    [(0, t0), (1, t1)],
  )
}

/// Segment of [`cells_pyramid`] anchored at a voxel inside it.
pub fn cell_segment(label: LabelId, time_point: u32) -> Arc<Segment> {
  let anchor_voxel = match (label, time_point) {
    (1, 0) => [4.0, 4.0, 4.0],
    (2, 0) => [16.0, 16.0, 16.0],
    (1, 1) => [6.0, 6.0, 6.0],
    (3, 1) => [15.0, 15.0, 15.0],
    // Background: nothing of the label there
    _ => [0.0, 0.0, 0.0],
  };
  let anchor = DVec3::from_array(anchor_voxel) * CELLS_SPACING;
  Arc::new(Segment::new("cells", label, time_point, anchor))
}

// =============================================================================
// Recording render surface
// =============================================================================

/// One content as last seen by the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedContent {
  pub name: String,
  pub color: Color,
  pub transparency: f32,
  pub locked: bool,
  pub triangles: usize,
}

#[derive(Default)]
pub struct Recording {
  pub contents: BTreeMap<ContentHandle, RecordedContent>,
  pub animations: Vec<(ContentHandle, FocusAnimation)>,
  pub auto_adjust_view: Option<bool>,
  pub surfaces_created: usize,
  next_handle: u64,
  hook: Option<CloseHook>,
}

/// Test-side view of every surface created by its factory.
#[derive(Clone, Default)]
pub struct RecordingHandle {
  recording: Arc<Mutex<Recording>>,
}

impl RecordingHandle {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn lock(&self) -> MutexGuard<'_, Recording> {
    self.recording.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Factory producing surfaces that report into this handle.
  pub fn factory(&self) -> impl SurfaceFactory + 'static {
    let recording = Arc::clone(&self.recording);
    move || -> Result<Box<dyn RenderSurface>> {
      recording
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .surfaces_created += 1;
      Ok(Box::new(RecordingSurface {
        recording: Arc::clone(&recording),
      }))
    }
  }

  /// Simulate the user closing the window.
  pub fn close(&self) {
    let hook = {
      let mut recording = self.lock();
      recording.contents.clear();
      recording.hook.take()
    };
    if let Some(hook) = hook {
      hook();
    }
  }

  pub fn names(&self) -> Vec<String> {
    self.lock().contents.values().map(|c| c.name.clone()).collect()
  }

  pub fn colors(&self) -> Vec<Color> {
    self.lock().contents.values().map(|c| c.color).collect()
  }

  pub fn content_count(&self) -> usize {
    self.lock().contents.len()
  }

  pub fn animation_count(&self) -> usize {
    self.lock().animations.len()
  }

  pub fn surfaces_created(&self) -> usize {
    self.lock().surfaces_created
  }
}

struct RecordingSurface {
  recording: Arc<Mutex<Recording>>,
}

impl RecordingSurface {
  fn with_content(&self, handle: ContentHandle, f: impl FnOnce(&mut RecordedContent)) {
    let mut recording = self.recording.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(content) = recording.contents.get_mut(&handle) {
      f(content);
    }
  }
}

impl RenderSurface for RecordingSurface {
  fn add_mesh(&mut self, name: &str, geometry: &MeshGeometry, color: Color) -> Result<ContentHandle> {
    let mut recording = self.recording.lock().unwrap_or_else(PoisonError::into_inner);
    let handle = ContentHandle(recording.next_handle);
    recording.next_handle += 1;
    recording.contents.insert(
      handle,
      RecordedContent {
        name: name.to_string(),
        color,
        transparency: 0.0,
        locked: false,
        triangles: geometry.triangle_count(),
      },
    );
    Ok(handle)
  }

  fn remove_content(&mut self, handle: ContentHandle) {
    self
      .recording
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contents
      .remove(&handle);
  }

  fn set_color(&mut self, handle: ContentHandle, color: Color) {
    self.with_content(handle, |c| c.color = color);
  }

  fn set_transparency(&mut self, handle: ContentHandle, transparency: f32) {
    self.with_content(handle, |c| c.transparency = transparency);
  }

  fn set_locked(&mut self, handle: ContentHandle, locked: bool) {
    self.with_content(handle, |c| c.locked = locked);
  }

  fn set_auto_adjust_view(&mut self, enabled: bool) {
    self
      .recording
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .auto_adjust_view = Some(enabled);
  }

  fn content_count(&self) -> usize {
    self
      .recording
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contents
      .len()
  }

  fn animate_focus(&mut self, handle: ContentHandle, animation: &FocusAnimation) {
    self
      .recording
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .animations
      .push((handle, *animation));
  }

  fn on_close(&mut self, hook: CloseHook) {
    self
      .recording
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .hook = Some(hook);
  }
}
