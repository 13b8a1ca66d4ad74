//! Error types for segment meshing and scene synchronization.
//!
//! Failures are per segment: the synchronizer logs them and moves on to the
//! next segment. Empty geometry and a truncated flood fill are not errors.

use crate::types::{SegmentKey, VoxelInterval};

pub type Result<T> = std::result::Result<T, MeshError>;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
  /// Auto-resolution needs a bounding box to size each level against the
  /// voxel budget.
  #[error(
    "automatic resolution level selection is enabled, but segment {0} has no bounding box; \
     this combination is not supported"
  )]
  AutoResolutionWithoutBounds(SegmentKey),

  /// The segment references an image with no registered volume source.
  #[error("segment {segment} references image `{image_id}`, which has no volume source")]
  MissingSource {
    segment: SegmentKey,
    image_id: String,
  },

  #[error("volume source `{image_id}` has no data for time point {time_point} at level {level}")]
  MissingVolume {
    image_id: String,
    time_point: u32,
    level: usize,
  },

  #[error("seed voxel {seed:?} of segment {segment} lies outside the label volume {extent:?}")]
  SeedOutsideVolume {
    segment: SegmentKey,
    seed: [i64; 3],
    extent: VoxelInterval,
  },

  /// Unexpected fault while generating a mesh.
  #[error("mesh extraction for segment {segment} failed: {message}")]
  ExtractionPanicked { segment: SegmentKey, message: String },

  #[error("invalid view configuration: {0}")]
  InvalidConfig(String),

  #[error("render surface unavailable: {0}")]
  SurfaceUnavailable(String),
}

impl MeshError {
  /// True for errors caused by an unsupported configuration rather than data.
  pub fn is_configuration_error(&self) -> bool {
    matches!(
      self,
      MeshError::AutoResolutionWithoutBounds(_) | MeshError::InvalidConfig(_)
    )
  }
}
