//! Segment coloring models.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::{Color, Segment};

/// Deterministic segment → color mapping.
pub trait ColoringModel: Send + Sync {
  fn color_of(&self, segment: &Segment) -> Color;
}

/// Closure-backed coloring.
impl<F> ColoringModel for F
where
  F: Fn(&Segment) -> Color + Send + Sync,
{
  fn color_of(&self, segment: &Segment) -> Color {
    self(segment)
  }
}

/// Same color for every segment. The color can be swapped at runtime; call
/// the synchronizer's `on_coloring_changed` afterwards.
#[derive(Debug)]
pub struct FixedColoring {
  color: AtomicU32,
}

impl FixedColoring {
  pub fn new(color: Color) -> Self {
    Self {
      color: AtomicU32::new(color.0),
    }
  }

  pub fn set(&self, color: Color) {
    self.color.store(color.0, Ordering::Relaxed);
  }

  pub fn get(&self) -> Color {
    Color(self.color.load(Ordering::Relaxed))
  }
}

impl ColoringModel for FixedColoring {
  fn color_of(&self, _segment: &Segment) -> Color {
    self.get()
  }
}

/// Distinct colors for neighbouring labels from a hashed label id.
///
/// Hue follows the golden-ratio sequence; saturation and value are varied
/// slightly so that labels with close hues still separate.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlasbeyColoring {
  seed: u64,
}

impl GlasbeyColoring {
  pub fn new(seed: u64) -> Self {
    Self { seed }
  }
}

/// SplitMix64 finalizer.
fn mix(mut x: u64) -> u64 {
  x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
  x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
  x ^ (x >> 31)
}

/// HSV (all in [0, 1]) to packed opaque RGB.
fn hsv_to_color(h: f64, s: f64, v: f64) -> Color {
  let h6 = (h.fract() * 6.0).clamp(0.0, 6.0);
  let i = h6.floor();
  let f = h6 - i;
  let p = v * (1.0 - s);
  let q = v * (1.0 - s * f);
  let t = v * (1.0 - s * (1.0 - f));
  let (r, g, b) = match i as u32 % 6 {
    0 => (v, t, p),
    1 => (q, v, p),
    2 => (p, v, t),
    3 => (p, q, v),
    4 => (t, p, v),
    _ => (v, p, q),
  };
  let channel = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
  Color::from_rgb(channel(r), channel(g), channel(b))
}

impl ColoringModel for GlasbeyColoring {
  fn color_of(&self, segment: &Segment) -> Color {
    const GOLDEN: f64 = 0.618_033_988_749_895;
    let hash = mix(segment.label_id() ^ self.seed);
    let hue = (hash as f64 / u64::MAX as f64 + segment.label_id() as f64 * GOLDEN).fract();
    let saturation = 0.55 + ((hash >> 8) & 0xff) as f64 / 255.0 * 0.45;
    let value = 0.7 + ((hash >> 16) & 0xff) as f64 / 255.0 * 0.3;
    hsv_to_color(hue, saturation, value)
  }
}
