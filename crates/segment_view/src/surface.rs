//! Render surface without a window: keeps a content table and logs every
//! call so a scenario run can be followed from the log.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use segment_mesh::config::FocusAnimation;
use segment_mesh::scene::{CloseHook, ContentHandle, RenderSurface};
use segment_mesh::{Color, MeshGeometry};

/// One content item on the headless surface.
#[derive(Clone, Debug)]
pub struct HeadlessContent {
  pub name: String,
  pub color: Color,
  pub transparency: f32,
  pub triangles: usize,
}

#[derive(Default)]
struct SceneTable {
  contents: BTreeMap<ContentHandle, HeadlessContent>,
  focus_animations: usize,
  next_handle: u64,
  close_hook: Option<CloseHook>,
}

/// Shared view of the headless scene, usable after the surface was handed to
/// the synchronizer.
#[derive(Clone, Default)]
pub struct HeadlessScene {
  table: Arc<Mutex<SceneTable>>,
}

impl HeadlessScene {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, SceneTable> {
    self.table.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// A fresh surface drawing into this scene.
  pub fn surface(&self) -> Box<dyn RenderSurface> {
    Box::new(HeadlessSurface { scene: self.clone() })
  }

  /// Contents sorted by name.
  pub fn contents(&self) -> Vec<HeadlessContent> {
    let mut contents: Vec<_> = self.lock().contents.values().cloned().collect();
    contents.sort_by(|a, b| a.name.cmp(&b.name));
    contents
  }

  pub fn focus_animations(&self) -> usize {
    self.lock().focus_animations
  }

  /// Emulate the viewer window being closed by the user.
  pub fn close(&self) {
    let hook = {
      let mut table = self.lock();
      table.contents.clear();
      table.close_hook.take()
    };
    info!("viewer closed");
    if let Some(hook) = hook {
      hook();
    }
  }
}

struct HeadlessSurface {
  scene: HeadlessScene,
}

impl HeadlessSurface {
  fn update(&self, handle: ContentHandle, f: impl FnOnce(&mut HeadlessContent)) {
    if let Some(content) = self.scene.lock().contents.get_mut(&handle) {
      f(content);
    }
  }
}

impl RenderSurface for HeadlessSurface {
  fn add_mesh(&mut self, name: &str, geometry: &MeshGeometry, color: Color) -> segment_mesh::Result<ContentHandle> {
    let mut table = self.scene.lock();
    let handle = ContentHandle(table.next_handle);
    table.next_handle += 1;

    let bounds = geometry.bounds();
    info!(
      "add {} ({} triangles, bounds {:?}..{:?})",
      name,
      geometry.triangle_count(),
      bounds.min,
      bounds.max
    );
    table.contents.insert(
      handle,
      HeadlessContent {
        name: name.to_string(),
        color,
        transparency: 0.0,
        triangles: geometry.triangle_count(),
      },
    );
    Ok(handle)
  }

  fn remove_content(&mut self, handle: ContentHandle) {
    if let Some(content) = self.scene.lock().contents.remove(&handle) {
      info!("remove {}", content.name);
    }
  }

  fn set_color(&mut self, handle: ContentHandle, color: Color) {
    self.update(handle, |content| {
      debug!("color {} = {:#010x}", content.name, color.0);
      content.color = color;
    });
  }

  fn set_transparency(&mut self, handle: ContentHandle, transparency: f32) {
    self.update(handle, |content| content.transparency = transparency);
  }

  fn set_locked(&mut self, _handle: ContentHandle, _locked: bool) {}

  fn set_auto_adjust_view(&mut self, enabled: bool) {
    debug!("auto-adjust view: {}", enabled);
  }

  fn content_count(&self) -> usize {
    self.scene.lock().contents.len()
  }

  fn animate_focus(&mut self, handle: ContentHandle, animation: &FocusAnimation) {
    let mut table = self.scene.lock();
    table.focus_animations += 1;
    let name = table
      .contents
      .get(&handle)
      .map_or("<unknown>", |content| content.name.as_str());
    info!(
      "focus {} over {} ms in {} frames (zoom {})",
      name, animation.duration_ms, animation.frames, animation.zoom
    );
  }

  fn on_close(&mut self, hook: CloseHook) {
    self.scene.lock().close_hook = Some(hook);
  }
}
