//! Scenario file parsing.
//!
//! A scenario describes a synthetic label image (objects painted per time
//! point), the view configuration, and a script of selection / focus / time
//! point steps to replay against a headless scene.

use std::path::Path;

use anyhow::{bail, Context, Result};
use segment_mesh::{LabelId, ViewConfig};
use serde::Deserialize;

/// Root of a scenario TOML file.
#[derive(Debug, Deserialize)]
pub struct Scenario {
  #[serde(default)]
  pub view: ViewConfig,
  #[serde(default)]
  pub image: ImageSpec,
  pub objects: Vec<ObjectSpec>,
  pub steps: Vec<Step>,
}

/// Synthetic label image geometry.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImageSpec {
  pub name: String,
  /// Level 0 size in voxels.
  pub dimensions: [usize; 3],
  /// Level 0 voxel spacing.
  pub spacing: [f64; 3],
  /// Downsampling factor of each coarser level relative to level 0.
  pub levels: Vec<[usize; 3]>,
  pub time_points: u32,
}

impl Default for ImageSpec {
  fn default() -> Self {
    Self {
      name: "cells".to_string(),
      dimensions: [48, 48, 24],
      spacing: [0.5, 0.5, 1.0],
      levels: vec![[2, 2, 2], [4, 4, 4]],
      time_points: 1,
    }
  }
}

/// Labeled object painted into one time point, in level 0 voxels.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ObjectSpec {
  Block {
    label: LabelId,
    #[serde(default)]
    time_point: u32,
    min: [usize; 3],
    max: [usize; 3],
  },
  Ball {
    label: LabelId,
    #[serde(default)]
    time_point: u32,
    center: [f64; 3],
    radius: f64,
  },
}

impl ObjectSpec {
  pub fn label(&self) -> LabelId {
    match self {
      ObjectSpec::Block { label, .. } | ObjectSpec::Ball { label, .. } => *label,
    }
  }

  pub fn time_point(&self) -> u32 {
    match self {
      ObjectSpec::Block { time_point, .. } | ObjectSpec::Ball { time_point, .. } => *time_point,
    }
  }

  /// A voxel inside the object, used as the segment anchor.
  pub fn anchor_voxel(&self) -> [f64; 3] {
    match self {
      ObjectSpec::Block { min, max, .. } => {
        std::array::from_fn(|d| ((min[d] + max[d]) / 2) as f64)
      }
      ObjectSpec::Ball { center, .. } => center.map(f64::round),
    }
  }
}

/// One scripted interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
  Select {
    label: LabelId,
    #[serde(default)]
    time_point: u32,
  },
  Deselect {
    label: LabelId,
    #[serde(default)]
    time_point: u32,
  },
  Focus {
    label: LabelId,
    #[serde(default)]
    time_point: u32,
  },
  /// Switch the coloring seed and recolor.
  Recolor { seed: u64 },
  /// Rebuild every displayed mesh.
  Recompute,
  TimePoint { time_point: u32 },
  Enable,
  Disable,
}

impl Scenario {
  /// Load and check a scenario file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
    Self::parse(&content).with_context(|| format!("Invalid scenario: {}", path.display()))
  }

  pub fn parse(content: &str) -> Result<Self> {
    let scenario: Scenario = toml::from_str(content).context("Failed to parse scenario TOML")?;
    scenario.check()?;
    Ok(scenario)
  }

  fn check(&self) -> Result<()> {
    self.view.validate()?;

    if self.image.dimensions.contains(&0) {
      bail!("image dimensions must be non-zero, got {:?}", self.image.dimensions);
    }
    if self.image.spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
      bail!("image spacing must be positive, got {:?}", self.image.spacing);
    }
    if self.image.levels.iter().any(|factor| factor.contains(&0)) {
      bail!("downsampling factors must be non-zero, got {:?}", self.image.levels);
    }
    if self.image.time_points == 0 {
      bail!("image needs at least one time point");
    }
    if self.objects.is_empty() {
      bail!("scenario must define at least one object");
    }
    for object in &self.objects {
      if object.label() == 0 {
        bail!("label 0 is background and cannot be an object");
      }
      if object.time_point() >= self.image.time_points {
        bail!(
          "object {} is at time point {}, but the image has {} time points",
          object.label(),
          object.time_point(),
          self.image.time_points
        );
      }
    }
    Ok(())
  }
}
