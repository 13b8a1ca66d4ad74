//! Pipeline counters and extraction timing history.
//!
//! Counters are atomics so background tasks can record without touching the
//! synchronizer lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity: capacity.max(1),
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  /// Iterate over values (oldest to newest).
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl RollingWindow<u64> {
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.buffer.iter().sum::<u64>() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = self.buffer.iter().min()?;
    let max = self.buffer.iter().max()?;
    Some((*min, *max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128)
  }
}

/// Live counters of one synchronizer.
#[derive(Debug, Default)]
pub struct SyncStats {
  flood_fills: AtomicU64,
  extractions: AtomicU64,
  cache_hits: AtomicU64,
  empty_results: AtomicU64,
  failures: AtomicU64,
  /// Extraction durations in microseconds.
  extraction_timings: Mutex<RollingWindow<u64>>,
}

/// Point-in-time copy of [`SyncStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatsSnapshot {
  pub flood_fills: u64,
  pub extractions: u64,
  pub cache_hits: u64,
  pub empty_results: u64,
  pub failures: u64,
  pub last_extraction_us: Option<u64>,
  pub mean_extraction_us: f64,
}

impl SyncStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record_flood_fill(&self) {
    self.flood_fills.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_extraction(&self, elapsed_us: u64) {
    self.extractions.fetch_add(1, Ordering::Relaxed);
    self
      .extraction_timings
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(elapsed_us);
  }

  pub fn record_cache_hit(&self) {
    self.cache_hits.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_empty(&self) {
    self.empty_results.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_failure(&self) {
    self.failures.fetch_add(1, Ordering::Relaxed);
  }

  pub fn snapshot(&self) -> StatsSnapshot {
    let timings = self
      .extraction_timings
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    StatsSnapshot {
      flood_fills: self.flood_fills.load(Ordering::Relaxed),
      extractions: self.extractions.load(Ordering::Relaxed),
      cache_hits: self.cache_hits.load(Ordering::Relaxed),
      empty_results: self.empty_results.load(Ordering::Relaxed),
      failures: self.failures.load(Ordering::Relaxed),
      last_extraction_us: timings.last().copied(),
      mean_extraction_us: timings.average(),
    }
  }
}
