use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::Notify;

/// A (lineage, depth) coordinate in the category tree
///
/// The lineage is the root category a subtree descends from; the depth is the
/// distance from that root (0 at the root itself). All cross-job coordination
/// is keyed by this pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelKey {
    /// Root category title this subtree belongs to
    pub lineage: String,

    /// Distance from the lineage root
    pub depth: u32,
}

impl LevelKey {
    pub fn new(lineage: impl Into<String>, depth: u32) -> Self {
        Self {
            lineage: lineage.into(),
            depth,
        }
    }

    /// The key one level up, or None at depth 0
    pub fn predecessor(&self) -> Option<LevelKey> {
        self.depth
            .checked_sub(1)
            .map(|depth| LevelKey::new(self.lineage.clone(), depth))
    }
}

#[derive(Debug, Default)]
struct StateInner {
    /// Cumulative pages downloaded per (lineage, depth); add-only
    level_counts: HashMap<LevelKey, u64>,

    /// Categories currently executing per (lineage, depth)
    in_flight: HashMap<LevelKey, HashSet<String>>,
}

/// Shared coordination state for all category jobs
///
/// Holds the cumulative per-level page counts (read by the cap-pruning check)
/// and the per-level in-flight sets (the depth-ordering gate). A single mutex
/// guards both maps, so every operation is linearizable with respect to every
/// other, across keys as well as within one. Set membership survives
/// concurrent mark/clear calls for different categories on the same key.
///
/// `clear_in_flight` fires a release signal so gate waiters wake without
/// polling.
#[derive(Debug, Default)]
pub struct CrawlState {
    inner: Mutex<StateInner>,
    released: Notify,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the cumulative page count for `key`, returning the
    /// updated total
    pub fn bump_level_count(&self, key: &LevelKey, delta: u64) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let count = inner.level_counts.entry(key.clone()).or_insert(0);
        *count += delta;
        *count
    }

    /// Cumulative page count for `key`; 0 when nothing has been recorded
    pub fn level_count(&self, key: &LevelKey) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.level_counts.get(key).copied().unwrap_or(0)
    }

    /// Records `category` as executing at `key`
    ///
    /// The in-flight set is created lazily on first insert.
    pub fn mark_in_flight(&self, key: &LevelKey, category: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .in_flight
            .entry(key.clone())
            .or_default()
            .insert(category.to_string());
    }

    /// Removes `category` from the in-flight set at `key` and wakes gate
    /// waiters
    ///
    /// An empty set is dropped from the map entirely. Clearing a category
    /// that was never marked is a no-op.
    pub fn clear_in_flight(&self, key: &LevelKey, category: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(set) = inner.in_flight.get_mut(key) {
            set.remove(category);
            if set.is_empty() {
                inner.in_flight.remove(key);
            }
        }
        drop(inner);
        self.released.notify_waiters();
    }

    /// True iff any category is currently executing at `key`
    pub fn is_blocked(&self, key: &LevelKey) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.in_flight.get(key).is_some_and(|set| !set.is_empty())
    }

    /// Resolves after the next `clear_in_flight` call, on any key
    ///
    /// Callers re-check `is_blocked` after waking; a wakeup is a hint, not a
    /// guarantee that a particular gate opened.
    pub async fn released(&self) {
        self.released.notified().await;
    }
}
