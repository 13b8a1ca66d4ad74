//! Corner mask computation.
//!
//! The corner mask is an 8-bit value where each bit indicates whether a corner
//! of the 2x2x2 cell is inside the segment (negative sample).

/// Build corner mask from 8 samples.
///
/// Bit `i` is set when `samples[i] < 0`. Corner order matches
/// [`EDGE_CORNERS`](super::edge_table::EDGE_CORNERS).
#[inline]
pub fn build(samples: &[f32; 8]) -> u8 {
  samples
    .iter()
    .enumerate()
    .fold(0u8, |mask, (i, &s)| if s < 0.0 { mask | (1 << i) } else { mask })
}
