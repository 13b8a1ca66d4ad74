//! Naive Surface Nets isosurface extraction for one label of a label volume.
//!
//! The region of interest is turned into a binary sample grid (-1 inside the
//! target label, +1 elsewhere) padded by one background voxel on every side,
//! so segments touching the region border still close. Surface Nets then
//! places ONE vertex per cell containing a crossing, at the centroid of the
//! crossings, and emits a quad for every sample edge whose endpoints disagree.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ INPUT  label volume, voxel region, target label                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ SAMPLE GRID  region ∩ extent, padded by 1, binary samples       │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ PER CELL  corner mask → skip homogeneous → centroid vertex      │
//! │           → quads for active edges towards earlier cells        │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ OUTPUT  indexed mesh in voxel units of the volume               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output positions are in the volume's voxel coordinates; the caller scales
//! each axis by the level's voxel spacing to reach world units.

mod corner_mask;
mod edge_table;
mod vertex_calc;

use glam::{DVec3, Vec3A};
use tracing::warn;

use crate::types::{LabelId, MeshGeometry, VoxelInterval};
use crate::volume::LabelVolume;

pub use edge_table::{EDGE_CORNERS, EDGE_TABLE};

const INSIDE: f32 = -1.0;
const OUTSIDE: f32 = 1.0;

/// Indexed triangle mesh produced by extraction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceMesh {
  pub positions: Vec<[f32; 3]>,
  /// Triangle indices (3 indices per triangle).
  pub indices: Vec<u32>,
}

impl SurfaceMesh {
  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Multiply each axis by its scale factor.
  pub fn scale(&mut self, factors: DVec3) {
    let factors = factors.as_vec3();
    for p in &mut self.positions {
      p[0] *= factors.x;
      p[1] *= factors.y;
      p[2] *= factors.z;
    }
  }

  /// Flatten into a triangle soup.
  pub fn to_geometry(&self) -> MeshGeometry {
    let mut coordinates = Vec::with_capacity(self.indices.len() * 3);
    for &i in &self.indices {
      coordinates.extend_from_slice(&self.positions[i as usize]);
    }
    MeshGeometry::from_coordinates(coordinates)
  }
}

/// Binary samples of a padded voxel region, X fastest.
struct SampleGrid {
  origin: [i64; 3],
  dims: [usize; 3],
  samples: Vec<f32>,
}

impl SampleGrid {
  /// Sample `region` (already clipped to the volume) with one voxel of
  /// forced background around it.
  fn new(volume: &dyn LabelVolume, region: VoxelInterval, label: LabelId) -> Self {
    let padded = region.expanded(1);
    let dims = padded.dimensions();
    let mut samples = vec![OUTSIDE; dims[0] * dims[1] * dims[2]];

    for z in region.min[2]..=region.max[2] {
      for y in region.min[1]..=region.max[1] {
        for x in region.min[0]..=region.max[0] {
          if volume.label_at([x, y, z]) == label {
            let idx = ((x - padded.min[0]) as usize)
              + dims[0] * (((y - padded.min[1]) as usize) + dims[1] * ((z - padded.min[2]) as usize));
            samples[idx] = INSIDE;
          }
        }
      }
    }

    Self {
      origin: padded.min,
      dims,
      samples,
    }
  }

  #[inline]
  fn get(&self, x: usize, y: usize, z: usize) -> f32 {
    self.samples[x + self.dims[0] * (y + self.dims[1] * z)]
  }

  /// The 8 corner samples of the cell whose minimum corner is (x, y, z).
  #[inline]
  fn cell_samples(&self, x: usize, y: usize, z: usize) -> [f32; 8] {
    std::array::from_fn(|i| self.get(x + (i & 1), y + ((i >> 1) & 1), z + ((i >> 2) & 1)))
  }
}

/// Per-cell vertex index, `u32::MAX` where the cell has no vertex.
struct CellIndex {
  dims: [usize; 3],
  data: Vec<u32>,
}

impl CellIndex {
  fn new(dims: [usize; 3]) -> Self {
    Self {
      dims,
      data: vec![u32::MAX; dims[0] * dims[1] * dims[2]],
    }
  }

  #[inline]
  fn idx(&self, p: [usize; 3]) -> usize {
    p[0] + self.dims[0] * (p[1] + self.dims[1] * p[2])
  }

  #[inline]
  fn get(&self, p: [usize; 3]) -> Option<u32> {
    let v = self.data[self.idx(p)];
    (v != u32::MAX).then_some(v)
  }

  #[inline]
  fn set(&mut self, p: [usize; 3], value: u32) {
    let idx = self.idx(p);
    self.data[idx] = value;
  }
}

/// Extract the surface separating voxels labeled `label` from all others
/// inside `region`.
///
/// The region is clipped to the volume extent. An empty intersection or a
/// label absent from the region yields an empty mesh.
pub fn extract(volume: &dyn LabelVolume, region: VoxelInterval, label: LabelId) -> SurfaceMesh {
  let extent = volume.extent();
  if !extent.contains(&region) {
    warn!(
      ?region,
      ?extent,
      "extraction region is not fully contained in the label volume; clipping"
    );
  }

  let clipped = extent.intersect(&region);
  if clipped.is_empty() {
    return SurfaceMesh::default();
  }

  generate(&SampleGrid::new(volume, clipped, label))
}

/// Run Surface Nets over a sample grid.
fn generate(grid: &SampleGrid) -> SurfaceMesh {
  let mut mesh = SurfaceMesh::default();
  let cell_dims = grid.dims.map(|n| n.saturating_sub(1));
  if cell_dims.contains(&0) {
    return mesh;
  }

  let mut cells = CellIndex::new(cell_dims);
  let origin = Vec3A::new(
    grid.origin[0] as f32,
    grid.origin[1] as f32,
    grid.origin[2] as f32,
  );

  for z in 0..cell_dims[2] {
    for y in 0..cell_dims[1] {
      for x in 0..cell_dims[0] {
        let samples = grid.cell_samples(x, y, z);
        let corner_mask = corner_mask::build(&samples);

        // Homogeneous cell: all inside or all outside
        if corner_mask == 0 || corner_mask == 255 {
          continue;
        }

        let local = vertex_calc::compute_position(&samples, corner_mask);
        let position = origin + Vec3A::new(x as f32, y as f32, z as f32) + local;

        let vertex_index = mesh.positions.len() as u32;
        cells.set([x, y, z], vertex_index);
        mesh.positions.push(position.to_array());

        emit_quads([x, y, z], corner_mask, &cells, &mut mesh);
      }
    }
  }

  mesh
}

/// Emit quads for the three edges leaving the cell's minimum corner.
///
/// Each quad joins the four cells sharing the edge; all of them precede the
/// current cell in iteration order. Quads are split along the shorter
/// diagonal and wound so that faces point out of the segment.
fn emit_quads(pos: [usize; 3], corner_mask: u8, cells: &CellIndex, mesh: &mut SurfaceMesh) {
  let inside_at_origin = corner_mask & 1 != 0;

  for axis in 0..3 {
    let inside_at_end = corner_mask & (1 << (1 << axis)) != 0;
    if inside_at_origin == inside_at_end {
      continue;
    }

    let u = (axis + 1) % 3;
    let v = (axis + 2) % 3;

    // Skip boundary positions: the neighbouring cells do not exist
    if pos[u] == 0 || pos[v] == 0 {
      continue;
    }

    let mut pos_b = pos;
    pos_b[u] -= 1;
    let mut pos_c = pos;
    pos_c[v] -= 1;
    let mut pos_d = pos;
    pos_d[u] -= 1;
    pos_d[v] -= 1;

    let (Some(a), Some(b), Some(c), Some(d)) = (
      cells.get(pos),
      cells.get(pos_b),
      cells.get(pos_c),
      cells.get(pos_d),
    ) else {
      continue;
    };

    // Quad cycle is a → b → d → c when the edge leaves the segment
    let (b, c) = if inside_at_origin { (b, c) } else { (c, b) };

    let p = |i: u32| Vec3A::from_array(mesh.positions[i as usize]);
    if p(a).distance_squared(p(d)) <= p(b).distance_squared(p(c)) {
      mesh.indices.extend_from_slice(&[a, b, d, a, d, c]);
    } else {
      mesh.indices.extend_from_slice(&[a, b, c, b, d, c]);
    }
  }
}
