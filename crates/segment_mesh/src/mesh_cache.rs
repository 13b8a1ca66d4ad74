//! Per-segment geometry memoization.
//!
//! ```text
//!   prepare(segment, force) ──► Cached(geometry)            (no work)
//!            │
//!            └──────────────► Build(request)
//!                                   │  request.build(source)   (no lock needed)
//!                                   │    flood fill (if no box) → level → extract
//!                                   │    → scale → smooth → flatten
//!                                   ▼
//!                             store(build) ──► geometry
//! ```
//!
//! The split lets the synchronizer run the expensive middle step without
//! holding its lock; [`MeshCache::obtain`] chains all three for callers that
//! do not care.
//!
//! Entries are keyed by [`SegmentKey`] and never evicted. Empty results are
//! cached too, so a segment with no voxels is not re-extracted on every
//! reconciliation; a forced recompute retries it.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, info_span};
use web_time::Instant;

use crate::bounds::BoundingRegionResolver;
use crate::config::ViewConfig;
use crate::error::{MeshError, Result};
use crate::level::{LevelRequest, ResolutionLevelSelector};
use crate::smoothing::smooth;
use crate::stats::SyncStats;
use crate::surface_nets::extract;
use crate::threading::panic_message;
use crate::types::{MeshGeometry, RealBox, Segment, SegmentKey};
use crate::volume::VolumeSource;

/// Settings the build pipeline reads from the view configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshSettings {
  pub level: LevelRequest,
  pub smoothing_iterations: u32,
  pub flood_fill_voxel_cap: u64,
}

impl From<&ViewConfig> for MeshSettings {
  fn from(config: &ViewConfig) -> Self {
    Self {
      level: config.level_request(),
      smoothing_iterations: config.smoothing_iterations,
      flood_fill_voxel_cap: config.flood_fill_voxel_cap,
    }
  }
}

#[derive(Clone, Debug, Default)]
struct CachedSegment {
  bounding_box: Option<RealBox>,
  geometry: Option<Arc<MeshGeometry>>,
}

/// Outcome of a cache lookup.
#[derive(Debug)]
pub enum Lookup {
  Cached(Arc<MeshGeometry>),
  Build(MeshRequest),
}

/// Work order for one segment's geometry.
#[derive(Clone, Debug)]
pub struct MeshRequest {
  segment: Segment,
  /// Known box; `None` means the build starts with a flood fill.
  bounding_box: Option<RealBox>,
}

/// Result of [`MeshRequest::build`], ready to be stored.
#[derive(Debug)]
pub struct MeshBuild {
  pub key: SegmentKey,
  /// Box used by the build, including one inferred on the way.
  pub bounding_box: Option<RealBox>,
  pub geometry: Result<Arc<MeshGeometry>>,
}

impl MeshRequest {
  pub fn segment(&self) -> &Segment {
    &self.segment
  }

  /// True when the build will have to infer the bounding box.
  pub fn needs_flood_fill(&self) -> bool {
    self.bounding_box.is_none()
  }

  /// Run the pipeline against `source`. Does not touch any cache.
  ///
  /// A panic anywhere in the pipeline (flood fill, level choice, extraction)
  /// becomes [`MeshError::ExtractionPanicked`] for this segment only.
  pub fn build(self, source: &dyn VolumeSource, settings: &MeshSettings, stats: &SyncStats) -> MeshBuild {
    let _span = info_span!("build_mesh", segment = %self.segment.key).entered();

    let mut bounding_box = self.bounding_box;
    let geometry = catch_unwind(AssertUnwindSafe(|| {
      self.run(source, settings, stats, &mut bounding_box)
    }))
    .unwrap_or_else(|panic| {
      Err(MeshError::ExtractionPanicked {
        segment: self.segment.key.clone(),
        message: panic_message(&*panic),
      })
    });

    MeshBuild {
      key: self.segment.key,
      bounding_box,
      geometry,
    }
  }

  fn run(
    &self,
    source: &dyn VolumeSource,
    settings: &MeshSettings,
    stats: &SyncStats,
    bounding_box: &mut Option<RealBox>,
  ) -> Result<Arc<MeshGeometry>> {
    let segment = &self.segment;
    let time_point = segment.time_point();

    let region = match *bounding_box {
      Some(region) => region,
      None => {
        let missing = || MeshError::MissingVolume {
          image_id: source.name().to_string(),
          time_point,
          level: 0,
        };
        let volume = source.volume(time_point, 0).ok_or_else(missing)?;
        let spacing = source.spacing(0).ok_or_else(missing)?;

        stats.record_flood_fill();
        let estimate =
          BoundingRegionResolver::new(settings.flood_fill_voxel_cap).resolve(segment, &*volume, spacing)?;
        debug!(filled = estimate.fill.filled, "bounding box inferred by flood fill");
        *bounding_box = Some(estimate.bounding_box);
        estimate.bounding_box
      }
    };

    let level = ResolutionLevelSelector::new(settings.level).select(segment, Some(&region), source)?;
    let missing_level = || MeshError::MissingVolume {
      image_id: source.name().to_string(),
      time_point,
      level,
    };
    let volume = source.volume(time_point, level).ok_or_else(missing_level)?;
    let spacing = source.spacing(level).ok_or_else(missing_level)?;
    let voxels = region.to_voxels(spacing);

    let start = Instant::now();
    let mut mesh = extract(&*volume, voxels, segment.label_id());
    let geometry = if mesh.is_empty() {
      MeshGeometry::empty()
    } else {
      mesh.scale(spacing);
      smooth(&mut mesh, settings.smoothing_iterations);
      mesh.to_geometry()
    };
    let elapsed_us = start.elapsed().as_micros() as u64;
    stats.record_extraction(elapsed_us);

    if geometry.is_empty() {
      stats.record_empty();
      info!(
        label = segment.label_id(),
        ?voxels,
        level,
        "no voxels of the segment's label within its bounding box; nothing to display"
      );
    } else {
      debug!(
        level,
        triangles = geometry.triangle_count(),
        elapsed_us,
        "mesh extracted"
      );
    }

    Ok(Arc::new(geometry))
  }
}

/// Cached bounding boxes and geometry per segment.
#[derive(Debug, Default)]
pub struct MeshCache {
  entries: HashMap<SegmentKey, CachedSegment>,
}

impl MeshCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn geometry(&self, key: &SegmentKey) -> Option<Arc<MeshGeometry>> {
    self.entries.get(key).and_then(|e| e.geometry.clone())
  }

  /// Box computed for the segment, if any.
  pub fn bounding_box(&self, key: &SegmentKey) -> Option<RealBox> {
    self.entries.get(key).and_then(|e| e.bounding_box)
  }

  /// Decide whether `segment` needs a build.
  ///
  /// Without `force`, cached geometry is returned as is and a known bounding
  /// box (cached or preset on the segment) skips the flood fill. With
  /// `force`, both are recomputed.
  pub fn prepare(&self, segment: &Segment, force: bool) -> Lookup {
    let entry = self.entries.get(&segment.key);

    if !force {
      if let Some(geometry) = entry.and_then(|e| e.geometry.clone()) {
        return Lookup::Cached(geometry);
      }
    }

    let bounding_box = if force {
      None
    } else {
      entry
        .and_then(|e| e.bounding_box)
        .or(segment.bounding_box)
    };

    Lookup::Build(MeshRequest {
      segment: segment.clone(),
      bounding_box,
    })
  }

  /// Record a finished build. The bounding box is kept even when the
  /// geometry failed.
  pub fn store(&mut self, build: MeshBuild) -> Result<Arc<MeshGeometry>> {
    let entry = self.entries.entry(build.key).or_default();
    if let Some(bounding_box) = build.bounding_box {
      entry.bounding_box = Some(bounding_box);
    }
    let geometry = build.geometry?;
    entry.geometry = Some(Arc::clone(&geometry));
    Ok(geometry)
  }

  /// Cached geometry for `segment`, building it first when missing or
  /// forced.
  pub fn obtain(
    &mut self,
    segment: &Segment,
    force: bool,
    source: &dyn VolumeSource,
    settings: &MeshSettings,
    stats: &SyncStats,
  ) -> Result<Arc<MeshGeometry>> {
    match self.prepare(segment, force) {
      Lookup::Cached(geometry) => {
        stats.record_cache_hit();
        Ok(geometry)
      }
      Lookup::Build(request) => {
        let build = request.build(source, settings, stats);
        self.store(build)
      }
    }
  }

  /// Drop everything cached for a segment the owner discarded.
  pub fn forget(&mut self, key: &SegmentKey) -> bool {
    self.entries.remove(key).is_some()
  }
}

#[cfg(test)]
#[path = "mesh_cache_test.rs"]
mod mesh_cache_test;
