//! Taubin λ|μ mesh smoothing.
//!
//! Each iteration is a shrinking Laplacian step (λ) followed by an inflating
//! one (μ), which rounds off the voxel staircase without collapsing the
//! segment's volume.

use glam::Vec3A;
use rayon::prelude::*;

use crate::surface_nets::SurfaceMesh;

/// Shrink factor of the first pass.
pub const LAMBDA: f32 = 0.5;

/// Inflate factor of the second pass (|μ| slightly above λ).
pub const MU: f32 = -0.53;

/// Vertex → unique neighbour vertices, from triangle connectivity.
fn vertex_neighbors(mesh: &SurfaceMesh) -> Vec<Vec<u32>> {
  let mut neighbors = vec![Vec::new(); mesh.positions.len()];
  for tri in mesh.indices.chunks_exact(3) {
    for k in 0..3 {
      let a = tri[k];
      let b = tri[(k + 1) % 3];
      neighbors[a as usize].push(b);
      neighbors[b as usize].push(a);
    }
  }
  for list in &mut neighbors {
    list.sort_unstable();
    list.dedup();
  }
  neighbors
}

/// One Laplacian step: move each vertex by `factor` towards the mean of its
/// neighbours.
fn laplacian_step(positions: &[[f32; 3]], neighbors: &[Vec<u32>], factor: f32) -> Vec<[f32; 3]> {
  positions
    .par_iter()
    .zip(neighbors.par_iter())
    .map(|(p, adjacent)| {
      let p = Vec3A::from_array(*p);
      if adjacent.is_empty() {
        return p.to_array();
      }
      let sum: Vec3A = adjacent
        .iter()
        .map(|&n| Vec3A::from_array(positions[n as usize]))
        .sum();
      let mean = sum / adjacent.len() as f32;
      (p + factor * (mean - p)).to_array()
    })
    .collect()
}

/// Smooth the mesh in place. Connectivity is unchanged.
pub fn smooth(mesh: &mut SurfaceMesh, iterations: u32) {
  if iterations == 0 || mesh.is_empty() {
    return;
  }

  let neighbors = vertex_neighbors(mesh);
  for _ in 0..iterations {
    let shrunk = laplacian_step(&mesh.positions, &neighbors, LAMBDA);
    mesh.positions = laplacian_step(&shrunk, &neighbors, MU);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::surface_nets::extract;
  use crate::test_utils::block_volume;
  use crate::volume::LabelVolume;

  fn spread(mesh: &SurfaceMesh) -> f32 {
    let center: Vec3A = mesh
      .positions
      .iter()
      .map(|p| Vec3A::from_array(*p))
      .sum::<Vec3A>()
      / mesh.positions.len() as f32;
    mesh
      .positions
      .iter()
      .map(|p| (Vec3A::from_array(*p) - center).length())
      .fold(0.0, f32::max)
  }

  #[test]
  fn zero_iterations_is_identity() {
    let volume = block_volume([10, 10, 10], [2, 2, 2], [7, 7, 7], 1);
    let mut mesh = extract(&volume, volume.extent(), 1);
    let before = mesh.clone();

    smooth(&mut mesh, 0);
    assert_eq!(mesh, before);
  }

  #[test]
  fn smoothing_keeps_connectivity_and_rounds_corners() {
    let volume = block_volume([12, 12, 12], [2, 2, 2], [9, 9, 9], 1);
    let mut mesh = extract(&volume, volume.extent(), 1);
    let indices = mesh.indices.clone();
    let corner_distance = spread(&mesh);

    smooth(&mut mesh, 5);

    assert_eq!(mesh.indices, indices);
    assert!(spread(&mesh) < corner_distance);
    assert!(mesh
      .positions
      .iter()
      .all(|p| p.iter().all(|c| c.is_finite())));
  }

  #[test]
  fn neighbors_are_unique() {
    let volume = block_volume([5, 5, 5], [1, 1, 1], [3, 3, 3], 1);
    let mesh = extract(&volume, volume.extent(), 1);

    for list in vertex_neighbors(&mesh) {
      let mut sorted = list.clone();
      sorted.dedup();
      assert_eq!(sorted, list);
      assert!(!list.is_empty());
    }
  }
}
