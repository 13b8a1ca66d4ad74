//! Vertex placement: centroid of the edge crossings of a cell.

use glam::Vec3A;

use super::edge_table::{corner_position, EDGE_CORNERS, EDGE_TABLE};

/// Compute the cell-local vertex position for a cell with the given corner
/// mask, interpolating the zero crossing along every active edge.
#[inline]
pub fn compute_position(samples: &[f32; 8], corner_mask: u8) -> Vec3A {
  let edge_mask = EDGE_TABLE[corner_mask as usize];
  if edge_mask == 0 {
    return Vec3A::splat(0.5);
  }

  let mut sum = Vec3A::ZERO;
  let mut count = 0u32;

  for (edge, &[c0, c1]) in EDGE_CORNERS.iter().enumerate() {
    if edge_mask & (1 << edge) == 0 {
      continue;
    }

    let s0 = samples[c0 as usize];
    let s1 = samples[c1 as usize];
    let t = s0 / (s0 - s1);

    let p0 = Vec3A::from_array(corner_position(c0));
    let p1 = Vec3A::from_array(corner_position(c1));
    sum += p0 + t * (p1 - p0);
    count += 1;
  }

  sum / count as f32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::surface_nets::corner_mask;

  fn position(samples: [f32; 8]) -> Vec3A {
    compute_position(&samples, corner_mask::build(&samples))
  }

  #[test]
  fn single_inside_corner_pulls_vertex_toward_it() {
    let pos = position([-1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);

    // Crossings at (0.5,0,0), (0,0.5,0), (0,0,0.5)
    assert!((pos.x - 1.0 / 6.0).abs() < 1e-6);
    assert!((pos.y - 1.0 / 6.0).abs() < 1e-6);
    assert!((pos.z - 1.0 / 6.0).abs() < 1e-6);
  }

  #[test]
  fn half_inside_places_vertex_mid_cell() {
    let pos = position([-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0]);

    assert!((pos.z - 0.5).abs() < 1e-6);
    assert!((pos.x - 0.5).abs() < 1e-6);
    assert!((pos.y - 0.5).abs() < 1e-6);
  }

  #[test]
  fn homogeneous_cell_falls_back_to_center() {
    let pos = position([1.0; 8]);
    assert_eq!(pos, Vec3A::splat(0.5));
  }
}
