//! Bounding region inference by flood fill.
//!
//! A segment without a bounding box is grown from its anchor voxel over
//! face-connected (6-neighbour) voxels carrying the seed's label. The search is
//! capped at a voxel budget; hitting the cap yields the box of the partial
//! region, which is an accepted resource bound rather than a failure.

use std::collections::{HashMap, VecDeque};

use glam::DVec3;
use tracing::{debug, info, warn};

use crate::error::{MeshError, Result};
use crate::types::{LabelId, RealBox, Segment, VoxelInterval};
use crate::volume::LabelVolume;

/// Default voxel budget for a single flood fill (10⁹).
pub const DEFAULT_FLOOD_FILL_CAP: u64 = 1_000_000_000;

/// Face-connected neighbour offsets.
const NEIGHBORS: [[i64; 3]; 6] = [
  [1, 0, 0],
  [-1, 0, 0],
  [0, 1, 0],
  [0, -1, 0],
  [0, 0, 1],
  [0, 0, -1],
];

/// Result of a capped flood fill in voxel units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloodFill {
  /// Label value that was filled.
  pub label: LabelId,
  /// Minimal interval enclosing all filled voxels.
  pub region: VoxelInterval,
  /// Number of voxels filled.
  pub filled: u64,
  /// True when the voxel cap stopped the fill before the region was exhausted.
  pub truncated: bool,
}

/// Bounding box inferred for a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionEstimate {
  pub bounding_box: RealBox,
  pub fill: FloodFill,
}

/// Edge length of a visited chunk in voxels (8³ = 512 bits).
const CHUNK_SHIFT: i64 = 3;
const CHUNK_MASK: i64 = (1 << CHUNK_SHIFT) - 1;

/// Visited flags, one bit per voxel, allocated per 8³ chunk on first touch.
///
/// Memory follows the filled region, not the volume extent.
#[derive(Default)]
struct VisitedMask {
  chunks: HashMap<[i64; 3], [u64; 8]>,
}

impl VisitedMask {
  /// Mark a voxel, returning false if it was already marked.
  #[inline]
  fn insert(&mut self, voxel: [i64; 3]) -> bool {
    let key = voxel.map(|v| v >> CHUNK_SHIFT);
    let [x, y, z] = voxel.map(|v| (v & CHUNK_MASK) as usize);
    let bits = self.chunks.entry(key).or_insert([0; 8]);
    let (word, bit) = (z, x + 8 * y);
    let was_set = bits[word] & (1 << bit) != 0;
    bits[word] |= 1 << bit;
    !was_set
  }

  fn chunk_count(&self) -> usize {
    self.chunks.len()
  }
}

/// Flood fill from `seed` over voxels sharing the seed's label.
///
/// The seed must lie inside the volume extent. At most `voxel_cap` voxels are
/// filled.
pub fn flood_fill(volume: &dyn LabelVolume, seed: [i64; 3], voxel_cap: u64) -> FloodFill {
  let extent = volume.extent();
  let label = volume.label_at(seed);

  let mut visited = VisitedMask::default();
  let mut queue = VecDeque::new();
  let mut region = VoxelInterval::new(seed, seed);
  let mut filled = 0u64;

  visited.insert(seed);
  queue.push_back(seed);

  let mut truncated = false;

  while let Some(voxel) = queue.pop_front() {
    if filled >= voxel_cap {
      truncated = true;
      break;
    }

    filled += 1;
    for d in 0..3 {
      region.min[d] = region.min[d].min(voxel[d]);
      region.max[d] = region.max[d].max(voxel[d]);
    }

    for offset in &NEIGHBORS {
      let next = [voxel[0] + offset[0], voxel[1] + offset[1], voxel[2] + offset[2]];
      if extent.contains_voxel(next) && volume.label_at(next) == label && visited.insert(next) {
        queue.push_back(next);
      }
    }
  }

  debug!(filled, truncated, chunks = visited.chunk_count(), "flood fill finished");
  FloodFill {
    label,
    region,
    filled,
    truncated,
  }
}

/// Convert a real-world position to voxel coordinates by dividing by the
/// spacing and truncating. Axes beyond `num_dimensions` are zero.
pub fn to_voxel(position: DVec3, spacing: DVec3, num_dimensions: usize) -> [i64; 3] {
  let scaled = position / spacing;
  let coords = [scaled.x as i64, scaled.y as i64, scaled.z as i64];
  std::array::from_fn(|d| if d < num_dimensions { coords[d] } else { 0 })
}

/// Infers bounding boxes for segments lacking one.
#[derive(Clone, Copy, Debug)]
pub struct BoundingRegionResolver {
  voxel_cap: u64,
}

impl Default for BoundingRegionResolver {
  fn default() -> Self {
    Self::new(DEFAULT_FLOOD_FILL_CAP)
  }
}

impl BoundingRegionResolver {
  pub fn new(voxel_cap: u64) -> Self {
    Self {
      voxel_cap: voxel_cap.max(1),
    }
  }

  pub fn voxel_cap(&self) -> u64 {
    self.voxel_cap
  }

  /// Flood fill from the segment's anchor in a level-0 volume with the given
  /// spacing and return the real-world box of the filled region.
  pub fn resolve(
    &self,
    segment: &Segment,
    volume: &dyn LabelVolume,
    spacing: DVec3,
  ) -> Result<RegionEstimate> {
    let seed = to_voxel(segment.anchor, spacing, segment.num_dimensions);
    let extent = volume.extent();
    if !extent.contains_voxel(seed) {
      return Err(MeshError::SeedOutsideVolume {
        segment: segment.key.clone(),
        seed,
        extent,
      });
    }

    let fill = flood_fill(volume, seed, self.voxel_cap);

    if fill.label != segment.label_id() {
      warn!(
        segment = %segment.key,
        seed_label = fill.label,
        "anchor voxel carries a different label than the segment"
      );
    }
    if fill.truncated {
      info!(
        segment = %segment.key,
        filled = fill.filled,
        cap = self.voxel_cap,
        "flood fill reached its voxel budget; bounding box covers the partial region"
      );
    }

    let min = fill.region.min;
    let max = fill.region.max;
    let bounding_box = RealBox::new(
      DVec3::new(min[0] as f64, min[1] as f64, min[2] as f64) * spacing,
      DVec3::new(max[0] as f64, max[1] as f64, max[2] as f64) * spacing,
    );

    Ok(RegionEstimate { bounding_box, fill })
  }
}

#[cfg(test)]
#[path = "bounds_test.rs"]
mod bounds_test;
