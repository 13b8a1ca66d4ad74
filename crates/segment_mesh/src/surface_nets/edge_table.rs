//! Precomputed edge crossing table for the 2×2×2 cell.
//!
//! ```text
//!       6──────7         Corners (binary ZYX):
//!      /│     /│           0=(0,0,0)  1=(1,0,0)  2=(0,1,0)  3=(1,1,0)
//!     4─┼────5 │           4=(0,0,1)  5=(1,0,1)  6=(0,1,1)  7=(1,1,1)
//!     │ 2────┼─3
//!     │/     │/          +Y
//!     0──────1            │  +Z
//!                         │ /
//!                         └───+X
//! ```
//!
//! `EDGE_TABLE[corner_mask]` gives a 12-bit mask of the edges whose two
//! corners disagree on being inside the segment.

/// Edge endpoint corner indices.
pub const EDGE_CORNERS: [[u8; 2]; 12] = [
  [0, 1], // Edge 0:  X axis at Y=0, Z=0
  [0, 2], // Edge 1:  Y axis at X=0, Z=0
  [0, 4], // Edge 2:  Z axis at X=0, Y=0
  [1, 3], // Edge 3:  Y axis at X=1, Z=0
  [1, 5], // Edge 4:  Z axis at X=1, Y=0
  [2, 3], // Edge 5:  X axis at Y=1, Z=0
  [2, 6], // Edge 6:  Z axis at X=0, Y=1
  [3, 7], // Edge 7:  Z axis at X=1, Y=1
  [4, 5], // Edge 8:  X axis at Y=0, Z=1
  [4, 6], // Edge 9:  Y axis at X=0, Z=1
  [5, 7], // Edge 10: Y axis at X=1, Z=1
  [6, 7], // Edge 11: X axis at Y=1, Z=1
];

/// Corner mask → edge mask.
pub const EDGE_TABLE: [u16; 256] = generate_edge_table();

const fn generate_edge_table() -> [u16; 256] {
  let mut table = [0u16; 256];
  let mut corner_mask = 0usize;

  while corner_mask < 256 {
    let mut edge_mask = 0u16;
    let mut edge = 0;

    while edge < 12 {
      let c0 = EDGE_CORNERS[edge][0] as usize;
      let c1 = EDGE_CORNERS[edge][1] as usize;

      if (corner_mask >> c0) & 1 != (corner_mask >> c1) & 1 {
        edge_mask |= 1 << edge;
      }

      edge += 1;
    }

    table[corner_mask] = edge_mask;
    corner_mask += 1;
  }

  table
}

/// Corner position within the unit cell.
#[inline(always)]
pub const fn corner_position(corner: u8) -> [f32; 3] {
  [
    (corner & 1) as f32,
    ((corner >> 1) & 1) as f32,
    ((corner >> 2) & 1) as f32,
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn homogeneous_cells_have_no_crossings() {
    assert_eq!(EDGE_TABLE[0], 0);
    assert_eq!(EDGE_TABLE[255], 0);
  }

  #[test]
  fn single_corner_crosses_three_edges() {
    assert_eq!(EDGE_TABLE[0b0000_0001], 0b0000_0000_0111);
    for corner in 0..8 {
      assert_eq!(EDGE_TABLE[1 << corner].count_ones(), 3, "corner {}", corner);
    }
  }

  #[test]
  fn complement_masks_share_edges() {
    for mask in 0..256 {
      assert_eq!(EDGE_TABLE[mask], EDGE_TABLE[255 - mask]);
    }
  }

  #[test]
  fn edges_are_axis_aligned() {
    for [c0, c1] in EDGE_CORNERS {
      let a = corner_position(c0);
      let b = corner_position(c1);
      let differing = (0..3).filter(|&d| a[d] != b[d]).count();
      assert_eq!(differing, 1);
    }
  }
}
