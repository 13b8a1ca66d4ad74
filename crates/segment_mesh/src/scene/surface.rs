//! Render surface seam.
//!
//! The surface is whatever window or viewer displays meshes. The synchronizer
//! only calls it while holding its own lock, so implementations need no
//! locking of their own; they must not call back into the synchronizer from
//! these methods.

use crate::config::FocusAnimation;
use crate::error::Result;
use crate::types::{Color, MeshGeometry};

/// Handle of one piece of content inside a render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHandle(pub u64);

/// Called once when the surface is closed from outside (e.g. window closed).
pub type CloseHook = Box<dyn FnOnce() + Send>;

/// A 3D scene that can show named meshes.
pub trait RenderSurface: Send {
  /// Add a named triangle mesh and return its handle.
  fn add_mesh(&mut self, name: &str, geometry: &MeshGeometry, color: Color) -> Result<ContentHandle>;

  fn remove_content(&mut self, handle: ContentHandle);

  fn set_color(&mut self, handle: ContentHandle, color: Color);

  /// Transparency in [0, 1].
  fn set_transparency(&mut self, handle: ContentHandle, transparency: f32);

  /// Locked content cannot be moved interactively.
  fn set_locked(&mut self, handle: ContentHandle, locked: bool);

  /// Whether the camera re-frames the scene whenever content changes.
  fn set_auto_adjust_view(&mut self, enabled: bool);

  fn content_count(&self) -> usize;

  /// Animate the camera towards a content. Must not block until the
  /// animation finishes.
  fn animate_focus(&mut self, handle: ContentHandle, animation: &FocusAnimation);

  /// Register the teardown hook. Replaces any previous hook.
  fn on_close(&mut self, hook: CloseHook);
}

/// Creates render surfaces on demand.
pub trait SurfaceFactory: Send + Sync {
  fn create(&self) -> Result<Box<dyn RenderSurface>>;
}

impl<F> SurfaceFactory for F
where
  F: Fn() -> Result<Box<dyn RenderSurface>> + Send + Sync,
{
  fn create(&self) -> Result<Box<dyn RenderSurface>> {
    self()
  }
}
