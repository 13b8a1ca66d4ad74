//! Core data types shared by the meshing pipeline and the scene layer.

use std::fmt;
use std::sync::Arc;

use glam::DVec3;

/// Label value stored in a label volume. Zero is background.
pub type LabelId = u64;

/// Stable identity of a segment: label id, time point and owning image.
///
/// Label ids repeat across time points and images, so caches and scene
/// mappings are keyed by the full triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey {
  pub image_id: Arc<str>,
  pub label_id: LabelId,
  pub time_point: u32,
}

impl SegmentKey {
  pub fn new(image_id: impl Into<Arc<str>>, label_id: LabelId, time_point: u32) -> Self {
    Self {
      image_id: image_id.into(),
      label_id,
      time_point,
    }
  }
}

impl fmt::Display for SegmentKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}@t{}", self.image_id, self.label_id, self.time_point)
  }
}

/// One labeled object instance at a given time point within an image.
///
/// Segments are owned by the selection/table infrastructure. The meshing core
/// only reads them; bounding boxes and geometry computed for a segment live in
/// the [`MeshCache`](crate::mesh_cache::MeshCache) keyed by [`SegmentKey`].
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
  pub key: SegmentKey,

  /// Real-world anchor position inside the segment (flood-fill seed).
  pub anchor: DVec3,

  /// Spatial dimensionality (2 or 3). For 2D segments the Z extent is zero.
  pub num_dimensions: usize,

  /// Bounding box provided by the owner (e.g. from a segment table).
  pub bounding_box: Option<RealBox>,
}

impl Segment {
  pub fn new(image_id: impl Into<Arc<str>>, label_id: LabelId, time_point: u32, anchor: DVec3) -> Self {
    Self {
      key: SegmentKey::new(image_id, label_id, time_point),
      anchor,
      num_dimensions: 3,
      bounding_box: None,
    }
  }

  pub fn with_bounding_box(mut self, bounding_box: RealBox) -> Self {
    self.bounding_box = Some(bounding_box);
    self
  }

  pub fn with_dimensions(mut self, num_dimensions: usize) -> Self {
    self.num_dimensions = num_dimensions.clamp(1, 3);
    self
  }

  #[inline]
  pub fn label_id(&self) -> LabelId {
    self.key.label_id
  }

  #[inline]
  pub fn time_point(&self) -> u32 {
    self.key.time_point
  }

  #[inline]
  pub fn image_id(&self) -> &str {
    &self.key.image_id
  }
}

// =============================================================================
// Boxes
// =============================================================================

/// Real-world axis-aligned bounding box (inclusive corners).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealBox {
  pub min: DVec3,
  pub max: DVec3,
}

impl RealBox {
  /// Box spanning two corners; swapped coordinates are reordered per axis.
  pub fn new(a: DVec3, b: DVec3) -> Self {
    Self {
      min: a.min(b),
      max: a.max(b),
    }
  }

  /// Size of the box (max - min).
  #[inline]
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }

  #[inline]
  pub fn center(&self) -> DVec3 {
    (self.min + self.max) * 0.5
  }

  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  /// Convert to voxel units of a level by dividing by its spacing and
  /// truncating toward zero.
  pub fn to_voxels(&self, spacing: DVec3) -> VoxelInterval {
    let min = self.min / spacing;
    let max = self.max / spacing;
    VoxelInterval::new(
      [min.x as i64, min.y as i64, min.z as i64],
      [max.x as i64, max.y as i64, max.z as i64],
    )
  }
}

/// Integer voxel interval (inclusive corners).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoxelInterval {
  pub min: [i64; 3],
  pub max: [i64; 3],
}

impl VoxelInterval {
  pub fn new(min: [i64; 3], max: [i64; 3]) -> Self {
    Self { min, max }
  }

  /// Interval covering a volume of the given dimensions starting at the origin.
  pub fn from_dimensions(dimensions: [usize; 3]) -> Self {
    Self {
      min: [0; 3],
      max: [
        dimensions[0] as i64 - 1,
        dimensions[1] as i64 - 1,
        dimensions[2] as i64 - 1,
      ],
    }
  }

  /// True when min > max on some axis.
  pub fn is_empty(&self) -> bool {
    (0..3).any(|d| self.min[d] > self.max[d])
  }

  /// Extent per axis (0 when empty).
  pub fn dimensions(&self) -> [usize; 3] {
    std::array::from_fn(|d| (self.max[d] - self.min[d] + 1).max(0) as usize)
  }

  /// Number of voxels in the interval, saturating at `u64::MAX`.
  pub fn num_elements(&self) -> u64 {
    self
      .dimensions()
      .iter()
      .fold(1u64, |count, &n| count.saturating_mul(n as u64))
  }

  pub fn contains_voxel(&self, voxel: [i64; 3]) -> bool {
    (0..3).all(|d| voxel[d] >= self.min[d] && voxel[d] <= self.max[d])
  }

  pub fn contains(&self, other: &VoxelInterval) -> bool {
    other.is_empty() || (self.contains_voxel(other.min) && self.contains_voxel(other.max))
  }

  pub fn intersect(&self, other: &VoxelInterval) -> VoxelInterval {
    VoxelInterval {
      min: std::array::from_fn(|d| self.min[d].max(other.min[d])),
      max: std::array::from_fn(|d| self.max[d].min(other.max[d])),
    }
  }

  /// Grow the interval by `amount` voxels on every side.
  pub fn expanded(&self, amount: i64) -> VoxelInterval {
    VoxelInterval {
      min: self.min.map(|v| v - amount),
      max: self.max.map(|v| v + amount),
    }
  }
}

/// Float axis-aligned bounding box used for geometry bounds.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

// =============================================================================
// Geometry
// =============================================================================

/// Triangle soup in world units: 3 coordinates per vertex, 3 vertices per
/// triangle. Triangle order is unspecified.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGeometry {
  coordinates: Vec<f32>,
  bounds: MinMaxAABB,
}

impl MeshGeometry {
  /// Wrap a flat coordinate list. Trailing coordinates that do not form a
  /// full triangle are dropped.
  pub fn from_coordinates(mut coordinates: Vec<f32>) -> Self {
    coordinates.truncate(coordinates.len() - coordinates.len() % 9);
    let mut bounds = MinMaxAABB::empty();
    for vertex in coordinates.chunks_exact(3) {
      bounds.encapsulate([vertex[0], vertex[1], vertex[2]]);
    }
    Self { coordinates, bounds }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  /// Flat vertex coordinates.
  pub fn coordinates(&self) -> &[f32] {
    &self.coordinates
  }

  /// Iterate vertex positions.
  pub fn vertices(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
    self.coordinates.chunks_exact(3).map(|v| [v[0], v[1], v[2]])
  }

  pub fn vertex_count(&self) -> usize {
    self.coordinates.len() / 3
  }

  pub fn triangle_count(&self) -> usize {
    self.coordinates.len() / 9
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.coordinates.is_empty()
  }

  /// Bounds of all vertices (invalid when empty).
  pub fn bounds(&self) -> MinMaxAABB {
    self.bounds
  }
}

// =============================================================================
// Color
// =============================================================================

/// Packed ARGB color (8 bits per channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
  pub const WHITE: Color = Color(0xFFFF_FFFF);

  pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
    Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
  }

  pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
    Self::from_argb(0xFF, r, g, b)
  }

  #[inline]
  pub const fn alpha(self) -> u8 {
    (self.0 >> 24) as u8
  }

  #[inline]
  pub const fn red(self) -> u8 {
    (self.0 >> 16) as u8
  }

  #[inline]
  pub const fn green(self) -> u8 {
    (self.0 >> 8) as u8
  }

  #[inline]
  pub const fn blue(self) -> u8 {
    self.0 as u8
  }

  /// RGB channels normalized to [0, 1].
  pub fn to_rgb_f32(self) -> [f32; 3] {
    [
      self.red() as f32 / 255.0,
      self.green() as f32 / 255.0,
      self.blue() as f32 / 255.0,
    ]
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
