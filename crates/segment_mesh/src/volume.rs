//! Label volume access.
//!
//! [`VolumeSource`] and [`LabelVolume`] are the seams to the image storage
//! layer: a source exposes one random-access label volume per time point and
//! resolution level, plus the voxel spacing of every level. Level 0 is the
//! finest; coarser levels have larger spacing.
//!
//! [`LabelPyramid`] is a dense in-memory implementation used by tests and the
//! headless driver.

use std::collections::HashMap;
use std::sync::Arc;

use glam::DVec3;
use smallvec::SmallVec;

use crate::types::{LabelId, VoxelInterval};

/// Random-access label volume for one time point and level.
pub trait LabelVolume: Send + Sync {
  /// Voxel extent of the stored data.
  fn extent(&self) -> VoxelInterval;

  /// Label at a voxel. Voxels outside [`extent`](Self::extent) read as 0.
  fn label_at(&self, voxel: [i64; 3]) -> LabelId;
}

/// Multi-resolution, multi-timepoint label image.
pub trait VolumeSource: Send + Sync {
  /// Image identifier segments refer to.
  fn name(&self) -> &str;

  /// Number of pyramid levels.
  fn num_levels(&self) -> usize;

  /// Voxel spacing of a level in real-world units per voxel.
  fn spacing(&self, level: usize) -> Option<DVec3>;

  /// Whether data exists for a (time point, level) pair.
  fn is_present(&self, time_point: u32, level: usize) -> bool;

  /// Label volume for a (time point, level) pair.
  fn volume(&self, time_point: u32, level: usize) -> Option<Arc<dyn LabelVolume>>;
}

// =============================================================================
// DenseLabelVolume
// =============================================================================

/// Dense label array with X as the fastest-varying axis.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseLabelVolume {
  dimensions: [usize; 3],
  labels: Vec<LabelId>,
}

impl DenseLabelVolume {
  /// All-background volume.
  pub fn new(dimensions: [usize; 3]) -> Self {
    let len = dimensions.iter().product();
    Self {
      dimensions,
      labels: vec![0; len],
    }
  }

  /// Build a volume by evaluating `f` at every voxel.
  pub fn from_fn(dimensions: [usize; 3], mut f: impl FnMut([usize; 3]) -> LabelId) -> Self {
    let mut volume = Self::new(dimensions);
    for z in 0..dimensions[2] {
      for y in 0..dimensions[1] {
        for x in 0..dimensions[0] {
          let idx = volume.index(x, y, z);
          volume.labels[idx] = f([x, y, z]);
        }
      }
    }
    volume
  }

  pub fn dimensions(&self) -> [usize; 3] {
    self.dimensions
  }

  #[inline]
  fn index(&self, x: usize, y: usize, z: usize) -> usize {
    x + self.dimensions[0] * (y + self.dimensions[1] * z)
  }

  /// Label at an in-bounds voxel.
  #[inline]
  pub fn get(&self, x: usize, y: usize, z: usize) -> LabelId {
    self.labels[self.index(x, y, z)]
  }

  #[inline]
  pub fn set(&mut self, x: usize, y: usize, z: usize, label: LabelId) {
    let idx = self.index(x, y, z);
    self.labels[idx] = label;
  }

  /// Paint an inclusive axis-aligned block, clipped to the volume.
  pub fn fill_block(&mut self, min: [usize; 3], max: [usize; 3], label: LabelId) {
    let hi: [usize; 3] = std::array::from_fn(|d| max[d].min(self.dimensions[d].saturating_sub(1)));
    for z in min[2]..=hi[2] {
      for y in min[1]..=hi[1] {
        for x in min[0]..=hi[0] {
          self.set(x, y, z, label);
        }
      }
    }
  }

  /// Nearest-neighbour downsampling by an integer factor per axis.
  pub fn downsample(&self, factor: [usize; 3]) -> Self {
    let factor = factor.map(|f| f.max(1));
    let dimensions: [usize; 3] = std::array::from_fn(|d| self.dimensions[d].div_ceil(factor[d]));
    Self::from_fn(dimensions, |[x, y, z]| {
      self.get(x * factor[0], y * factor[1], z * factor[2])
    })
  }
}

impl LabelVolume for DenseLabelVolume {
  fn extent(&self) -> VoxelInterval {
    VoxelInterval::from_dimensions(self.dimensions)
  }

  #[inline]
  fn label_at(&self, voxel: [i64; 3]) -> LabelId {
    let [x, y, z] = voxel;
    if x < 0
      || y < 0
      || z < 0
      || x as usize >= self.dimensions[0]
      || y as usize >= self.dimensions[1]
      || z as usize >= self.dimensions[2]
    {
      return 0;
    }
    self.get(x as usize, y as usize, z as usize)
  }
}

// =============================================================================
// LabelPyramid
// =============================================================================

/// In-memory multi-resolution label image.
#[derive(Clone)]
pub struct LabelPyramid {
  name: String,
  spacings: SmallVec<[DVec3; 8]>,
  frames: HashMap<(u32, usize), Arc<DenseLabelVolume>>,
}

impl LabelPyramid {
  /// Create an empty pyramid with one entry per level spacing.
  pub fn new(name: impl Into<String>, spacings: impl IntoIterator<Item = DVec3>) -> Self {
    Self {
      name: name.into(),
      spacings: spacings.into_iter().collect(),
      frames: HashMap::new(),
    }
  }

  /// Build a pyramid from full-resolution frames, deriving each coarser level
  /// by downsampling level 0 with the given per-axis factors.
  pub fn with_downsampled_levels(
    name: impl Into<String>,
    base_spacing: DVec3,
    factors: &[[usize; 3]],
    frames: impl IntoIterator<Item = (u32, DenseLabelVolume)>,
  ) -> Self {
    let spacings = std::iter::once(base_spacing).chain(factors.iter().map(|f| {
      base_spacing * DVec3::new(f[0] as f64, f[1] as f64, f[2] as f64)
    }));
    let mut pyramid = Self::new(name, spacings);
    for (time_point, base) in frames {
      for (i, factor) in factors.iter().enumerate() {
        pyramid.insert(time_point, i + 1, base.downsample(*factor));
      }
      pyramid.insert(time_point, 0, base);
    }
    pyramid
  }

  /// Store the volume for a (time point, level) pair.
  pub fn insert(&mut self, time_point: u32, level: usize, volume: DenseLabelVolume) {
    self.frames.insert((time_point, level), Arc::new(volume));
  }

  /// Remove the volume for a (time point, level) pair.
  pub fn remove(&mut self, time_point: u32, level: usize) {
    self.frames.remove(&(time_point, level));
  }

  /// Time points with data at level 0, sorted.
  pub fn time_points(&self) -> Vec<u32> {
    let mut points: Vec<u32> = self
      .frames
      .keys()
      .filter(|(_, level)| *level == 0)
      .map(|(t, _)| *t)
      .collect();
    points.sort_unstable();
    points
  }
}

impl VolumeSource for LabelPyramid {
  fn name(&self) -> &str {
    &self.name
  }

  fn num_levels(&self) -> usize {
    self.spacings.len()
  }

  fn spacing(&self, level: usize) -> Option<DVec3> {
    self.spacings.get(level).copied()
  }

  fn is_present(&self, time_point: u32, level: usize) -> bool {
    self.frames.contains_key(&(time_point, level))
  }

  fn volume(&self, time_point: u32, level: usize) -> Option<Arc<dyn LabelVolume>> {
    self
      .frames
      .get(&(time_point, level))
      .map(|v| Arc::clone(v) as Arc<dyn LabelVolume>)
  }
}
