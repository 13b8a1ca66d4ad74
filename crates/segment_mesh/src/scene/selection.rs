//! Selection model and typed scene events.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::types::{Segment, SegmentKey};

/// Authoritative set of selected segments.
pub trait SelectionModel: Send + Sync {
  fn selected(&self) -> Vec<Arc<Segment>>;
}

/// Notification delivered to a synchronizer.
#[derive(Clone, Debug)]
pub enum SceneEvent {
  SelectionChanged,
  ColoringChanged,
  Focus(Arc<Segment>),
}

#[derive(Default)]
struct SelectionState {
  selected: BTreeMap<SegmentKey, Arc<Segment>>,
  focus: Option<Arc<Segment>>,
}

/// In-memory selection model that broadcasts [`SceneEvent`]s to subscribers.
///
/// Events are sent after the selection lock is released; disconnected
/// subscribers are dropped on the next broadcast.
#[derive(Default)]
pub struct SelectionSet {
  state: RwLock<SelectionState>,
  subscribers: Mutex<Vec<Sender<SceneEvent>>>,
}

impl SelectionSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// New event stream. Dropping the receiver unsubscribes.
  pub fn subscribe(&self) -> Receiver<SceneEvent> {
    let (tx, rx) = unbounded();
    self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(tx);
    rx
  }

  fn broadcast(&self, event: SceneEvent) {
    self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .retain(|tx| tx.send(event.clone()).is_ok());
  }

  fn modify<R>(&self, f: impl FnOnce(&mut SelectionState) -> R) -> R {
    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut state)
  }

  /// Add a segment. Returns false if it was already selected.
  pub fn select(&self, segment: Arc<Segment>) -> bool {
    let added = self.modify(|s| s.selected.insert(segment.key.clone(), segment).is_none());
    if added {
      self.broadcast(SceneEvent::SelectionChanged);
    }
    added
  }

  /// Remove a segment. Returns false if it was not selected.
  pub fn deselect(&self, key: &SegmentKey) -> bool {
    let removed = self.modify(|s| s.selected.remove(key).is_some());
    if removed {
      self.broadcast(SceneEvent::SelectionChanged);
    }
    removed
  }

  /// Replace the whole selection with one notification.
  pub fn set_selected(&self, segments: impl IntoIterator<Item = Arc<Segment>>) {
    let selected: BTreeMap<_, _> = segments
      .into_iter()
      .map(|s| (s.key.clone(), s))
      .collect();
    self.modify(|s| s.selected = selected);
    self.broadcast(SceneEvent::SelectionChanged);
  }

  pub fn clear(&self) {
    self.set_selected(std::iter::empty());
  }

  pub fn contains(&self, key: &SegmentKey) -> bool {
    self
      .state
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .selected
      .contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.state.read().unwrap_or_else(PoisonError::into_inner).selected.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Make `segment` the focus target and announce it.
  pub fn focus(&self, segment: Arc<Segment>) {
    self.modify(|s| s.focus = Some(Arc::clone(&segment)));
    self.broadcast(SceneEvent::Focus(segment));
  }

  /// Most recent focus target.
  pub fn focus_target(&self) -> Option<Arc<Segment>> {
    self.state.read().unwrap_or_else(PoisonError::into_inner).focus.clone()
  }

  /// Announce that the coloring model changed.
  pub fn notify_coloring_changed(&self) {
    self.broadcast(SceneEvent::ColoringChanged);
  }
}

impl SelectionModel for SelectionSet {
  fn selected(&self) -> Vec<Arc<Segment>> {
    self
      .state
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .selected
      .values()
      .cloned()
      .collect()
  }
}
