//! Scene synchronization: keeps a render surface's content in agreement with
//! an external selection, time point and coloring.
//!
//! - [`surface`]: the render surface seam ([`RenderSurface`], [`SurfaceFactory`]).
//! - [`selection`]: [`SelectionModel`], the in-memory [`SelectionSet`] and the
//!   typed [`SceneEvent`]s it broadcasts.
//! - [`coloring`]: [`ColoringModel`] and stock colorings.
//! - [`synchronizer`]: [`SceneSynchronizer`].

pub mod coloring;
pub mod selection;
pub mod surface;
pub mod synchronizer;

pub use coloring::{ColoringModel, FixedColoring, GlasbeyColoring};
pub use selection::{SceneEvent, SelectionModel, SelectionSet};
pub use surface::{CloseHook, ContentHandle, RenderSurface, SurfaceFactory};
pub use synchronizer::SceneSynchronizer;
