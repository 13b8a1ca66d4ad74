//! Resolution level selection.
//!
//! Two modes:
//! - explicit spacing: the level whose spacing best matches the request,
//! - auto-resolution (requested spacing 0): the finest level at which the
//!   segment's bounding box fits the voxel budget, else the coarsest level.

use glam::DVec3;
use tracing::info;

use crate::error::{MeshError, Result};
use crate::types::{RealBox, Segment};
use crate::volume::VolumeSource;

/// How the level for a segment is chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LevelRequest {
  /// Match a voxel spacing in real-world units.
  Spacing(f64),
  /// Finest level whose bounding-box voxel count is within the budget.
  Auto { max_voxels: u64 },
}

impl LevelRequest {
  /// Map the configured spacing to a request; 0 means auto-resolution.
  pub fn from_spacing(voxel_spacing: f64, max_voxels: u64) -> Self {
    if voxel_spacing == 0.0 {
      LevelRequest::Auto { max_voxels }
    } else {
      LevelRequest::Spacing(voxel_spacing)
    }
  }
}

/// Number of voxels a real-world box covers at the given spacing.
pub fn voxel_count(bounding_box: &RealBox, spacing: DVec3) -> u64 {
  bounding_box.to_voxels(spacing).num_elements()
}

/// Index of the level whose smallest-axis spacing is closest to `requested`.
/// Ties go to the finer level.
pub fn closest_spacing(spacings: &[(usize, DVec3)], requested: f64) -> Option<usize> {
  spacings
    .iter()
    .map(|(level, spacing)| (*level, (spacing.min_element() - requested).abs()))
    .fold(None, |best: Option<(usize, f64)>, (level, diff)| match best {
      Some((_, best_diff)) if best_diff <= diff => best,
      _ => Some((level, diff)),
    })
    .map(|(level, _)| level)
}

/// First level (in the order given, finest first) whose voxel count is within
/// `max_voxels`; the last level if none qualifies.
pub fn first_within_budget(counts: &[(usize, u64)], max_voxels: u64) -> Option<usize> {
  counts
    .iter()
    .find(|(_, count)| *count <= max_voxels)
    .or_else(|| counts.last())
    .map(|(level, _)| *level)
}

/// Picks the pyramid level to mesh a segment at.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionLevelSelector {
  request: LevelRequest,
}

impl ResolutionLevelSelector {
  pub fn new(request: LevelRequest) -> Self {
    Self { request }
  }

  pub fn request(&self) -> LevelRequest {
    self.request
  }

  /// Select a level for `segment`, considering only levels present for the
  /// segment's time point.
  ///
  /// Auto-resolution without a bounding box is a configuration error.
  pub fn select(
    &self,
    segment: &Segment,
    bounding_box: Option<&RealBox>,
    source: &dyn VolumeSource,
  ) -> Result<usize> {
    let time_point = segment.time_point();
    let spacings: Vec<(usize, DVec3)> = (0..source.num_levels())
      .filter(|&level| source.is_present(time_point, level))
      .filter_map(|level| source.spacing(level).map(|s| (level, s)))
      .collect();

    let missing = || MeshError::MissingVolume {
      image_id: source.name().to_string(),
      time_point,
      level: 0,
    };

    match self.request {
      LevelRequest::Spacing(requested) => closest_spacing(&spacings, requested).ok_or_else(missing),
      LevelRequest::Auto { max_voxels } => {
        let bounding_box =
          bounding_box.ok_or_else(|| MeshError::AutoResolutionWithoutBounds(segment.key.clone()))?;

        let counts: Vec<(usize, u64)> = spacings
          .iter()
          .map(|(level, spacing)| (*level, voxel_count(bounding_box, *spacing)))
          .collect();

        if let Some((_, finest)) = counts.first() {
          if *finest > max_voxels {
            info!(
              segment = %segment.key,
              voxels = finest,
              max_voxels,
              "segment bounding box exceeds the voxel budget at full resolution; meshing may take a while"
            );
          }
        }

        first_within_budget(&counts, max_voxels).ok_or_else(missing)
      }
    }
  }
}

#[cfg(test)]
#[path = "level_test.rs"]
mod level_test;
