//! segment_mesh - Surface meshes for labeled segments of volumetric images
//!
//! Renders selected labeled objects of a multi-resolution, multi-timepoint
//! label image as triangle meshes and keeps a 3D scene in step with an
//! externally owned selection.
//!
//! # Pipeline
//!
//! - **Bounding region**: capped 6-connected flood fill from the segment's
//!   anchor when no bounding box is known ([`bounds`])
//! - **Resolution level**: explicit spacing match or auto-resolution against
//!   a voxel budget ([`level`])
//! - **Isosurface**: Surface Nets over a binary, zero-padded label region
//!   ([`surface_nets`]), scaled to world units and smoothed ([`smoothing`])
//! - **Cache**: geometry memoized per segment identity ([`mesh_cache`])
//! - **Scene**: reconciliation of displayed content against selection, time
//!   point and coloring on background tasks ([`scene`])
//!
//! # Example
//!
//! ```ignore
//! use segment_mesh::{scene::*, volume::LabelPyramid, ViewConfig};
//!
//! let selection = Arc::new(SelectionSet::new());
//! let sync = SceneSynchronizer::new(selection.clone(), Arc::new(GlasbeyColoring::default()), factory);
//! sync.register_source(Arc::new(pyramid));
//! sync.listen(selection.subscribe())?;
//! sync.set_enabled(true)?;
//!
//! selection.select(segment);        // meshed and shown in the background
//! selection.focus(segment);         // camera animates towards it
//! ```

pub mod bounds;
pub mod config;
pub mod error;
pub mod level;
pub mod mesh_cache;
pub mod scene;
pub mod smoothing;
pub mod stats;
pub mod surface_nets;
pub mod threading;
pub mod types;
pub mod volume;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used items
pub use bounds::{BoundingRegionResolver, FloodFill, DEFAULT_FLOOD_FILL_CAP};
pub use config::{FocusAnimation, ViewConfig};
pub use error::{MeshError, Result};
pub use level::{LevelRequest, ResolutionLevelSelector};
pub use mesh_cache::{MeshCache, MeshSettings};
pub use scene::{
  ColoringModel, ContentHandle, GlasbeyColoring, RenderSurface, SceneEvent, SceneSynchronizer,
  SelectionModel, SelectionSet,
};
pub use stats::{StatsSnapshot, SyncStats};
pub use surface_nets::{extract, SurfaceMesh};
pub use threading::{TaskId, TaskPool};
pub use types::{Color, LabelId, MeshGeometry, RealBox, Segment, SegmentKey, VoxelInterval};
pub use volume::{DenseLabelVolume, LabelPyramid, LabelVolume, VolumeSource};
