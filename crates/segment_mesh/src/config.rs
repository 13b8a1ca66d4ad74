//! View configuration.
//!
//! Every field has a default, so a partial TOML table deserializes cleanly.
//! Changes applied through the synchronizer take effect on the next
//! reconciliation.

use serde::Deserialize;

use crate::bounds::DEFAULT_FLOOD_FILL_CAP;
use crate::error::{MeshError, Result};
use crate::level::LevelRequest;

/// Camera animation parameters for focusing a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusAnimation {
  pub duration_ms: u64,
  pub frames: u32,
  pub zoom: f64,
  pub min_pan_xy: f64,
  pub min_pan_z: f64,
}

/// Presentation and meshing settings of a scene.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
  /// Content names are `<prefix>_<labelId>`.
  pub content_name_prefix: String,
  /// Transparency of new content in [0, 1].
  pub transparency: f32,
  pub smoothing_iterations: u32,
  pub focus_animation_ms: u64,
  pub focus_animation_frames: u32,
  pub focus_zoom: f64,
  pub focus_min_pan_xy: f64,
  pub focus_min_pan_z: f64,
  /// Voxel budget for auto-resolution.
  pub max_segment_voxels: u64,
  /// Fixed voxel spacing; 0 selects auto-resolution.
  pub voxel_spacing: f64,
  pub flood_fill_voxel_cap: u64,
}

impl Default for ViewConfig {
  fn default() -> Self {
    Self {
      content_name_prefix: String::new(),
      transparency: 0.0,
      smoothing_iterations: 5,
      focus_animation_ms: 750,
      focus_animation_frames: 30,
      focus_zoom: 0.8,
      focus_min_pan_xy: 20.0,
      focus_min_pan_z: 20.0,
      max_segment_voxels: 1_000_000,
      voxel_spacing: 0.0,
      flood_fill_voxel_cap: DEFAULT_FLOOD_FILL_CAP,
    }
  }
}

impl ViewConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_content_name_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.content_name_prefix = prefix.into();
    self
  }

  pub fn with_transparency(mut self, transparency: f32) -> Self {
    self.transparency = transparency;
    self
  }

  pub fn with_smoothing_iterations(mut self, iterations: u32) -> Self {
    self.smoothing_iterations = iterations;
    self
  }

  pub fn with_focus_animation(mut self, duration_ms: u64, zoom: f64) -> Self {
    self.focus_animation_ms = duration_ms;
    self.focus_zoom = zoom;
    self
  }

  pub fn with_focus_min_pan(mut self, xy: f64, z: f64) -> Self {
    self.focus_min_pan_xy = xy;
    self.focus_min_pan_z = z;
    self
  }

  pub fn with_max_segment_voxels(mut self, max_voxels: u64) -> Self {
    self.max_segment_voxels = max_voxels;
    self
  }

  pub fn with_voxel_spacing(mut self, spacing: f64) -> Self {
    self.voxel_spacing = spacing;
    self
  }

  pub fn with_flood_fill_voxel_cap(mut self, cap: u64) -> Self {
    self.flood_fill_voxel_cap = cap;
    self
  }

  /// Level request derived from the spacing setting.
  pub fn level_request(&self) -> LevelRequest {
    LevelRequest::from_spacing(self.voxel_spacing, self.max_segment_voxels)
  }

  pub fn focus_animation(&self) -> FocusAnimation {
    FocusAnimation {
      duration_ms: self.focus_animation_ms,
      frames: self.focus_animation_frames,
      zoom: self.focus_zoom,
      min_pan_xy: self.focus_min_pan_xy,
      min_pan_z: self.focus_min_pan_z,
    }
  }

  /// Reject values the pipeline cannot work with.
  pub fn validate(&self) -> Result<()> {
    if !(0.0..=1.0).contains(&self.transparency) {
      return Err(MeshError::InvalidConfig(format!(
        "transparency must be within [0, 1], got {}",
        self.transparency
      )));
    }
    if !self.voxel_spacing.is_finite() || self.voxel_spacing < 0.0 {
      return Err(MeshError::InvalidConfig(format!(
        "voxel spacing must be finite and non-negative, got {}",
        self.voxel_spacing
      )));
    }
    if self.max_segment_voxels == 0 {
      return Err(MeshError::InvalidConfig(
        "max_segment_voxels must be greater than zero".into(),
      ));
    }
    if self.flood_fill_voxel_cap == 0 {
      return Err(MeshError::InvalidConfig(
        "flood_fill_voxel_cap must be greater than zero".into(),
      ));
    }
    if !self.focus_zoom.is_finite() || self.focus_zoom <= 0.0 {
      return Err(MeshError::InvalidConfig(format!(
        "focus zoom must be positive, got {}",
        self.focus_zoom
      )));
    }
    Ok(())
  }
}
