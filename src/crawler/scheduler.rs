//! Scheduling primitives: the pending-work queue and the admission gate
//!
//! This module handles:
//! - `JobRequest`, the immutable description of one category to process
//! - `WorkQueue`, the unbounded FIFO shared by the control loop and the jobs
//!   that discover subcategories
//! - `Scheduler`, which decides whether the head of the queue may start
//!
//! The gate rule: a request at depth L may start only once no same-lineage
//! category at depth L-1 is still executing. Depth 0 has no predecessor and
//! is always admissible. Every depth-(L-1) job bumps its level count before
//! releasing its in-flight entry, so an admitted depth-L job always reads a
//! final previous-level count for its cap check.

use crate::output::sanitize_component;
use crate::state::{CrawlState, LevelKey};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Description of one category to process
///
/// Created once (by seeding for roots, by a completing job for discovered
/// subcategories) and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Root category this subtree descends from (gating partition key)
    pub lineage: String,

    /// Full title of the category this request processes
    pub category: String,

    /// Distance from the lineage root, 0 at the root
    pub depth: u32,

    /// Directory this category's pages are written into
    pub dir: PathBuf,

    /// Zero-padded hierarchical counter string, e.g. "00_003_"
    pub prefix: String,
}

impl JobRequest {
    /// Builds the request for root category number `index`
    ///
    /// `category` is the full namespace-prefixed title used against the API
    /// and as the lineage id; `display_name` is the bare configured name used
    /// for the directory.
    pub fn root(index: usize, category: &str, display_name: &str, data_root: &Path) -> Self {
        let prefix = format!("{:02}_", index);
        Self {
            lineage: category.to_string(),
            category: category.to_string(),
            depth: 0,
            dir: data_root.join(format!("{}{}", prefix, sanitize_component(display_name))),
            prefix,
        }
    }

    /// Builds the request for discovered subcategory number `index`
    ///
    /// The child inherits the lineage, descends one level, and nests its
    /// directory and prefix under this request's. `namespace_prefix` is
    /// stripped off the subcategory title for the directory name.
    pub fn child(&self, index: usize, subcat_title: &str, namespace_prefix: &str) -> Self {
        let stem = subcat_title
            .strip_prefix(namespace_prefix)
            .unwrap_or(subcat_title);
        let tag = format!("{}{:03}_", self.prefix, index);
        Self {
            lineage: self.lineage.clone(),
            category: subcat_title.to_string(),
            depth: self.depth + 1,
            dir: self.dir.join(format!("{}{}", tag, sanitize_component(stem))),
            prefix: tag,
        }
    }

    /// Coordination key of this request
    pub fn key(&self) -> LevelKey {
        LevelKey::new(self.lineage.clone(), self.depth)
    }

    /// Coordination key of the previous level; None at depth 0
    pub fn predecessor_key(&self) -> Option<LevelKey> {
        self.key().predecessor()
    }
}

/// Unbounded FIFO of pending job requests
///
/// Pushes never block; the only backpressure in the system is worker-pool
/// admission. A push wakes the control loop if it is idle-waiting.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<JobRequest>>,
    added: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request to the tail
    pub fn push(&self, request: JobRequest) {
        self.items.lock().unwrap().push_back(request);
        self.added.notify_one();
    }

    /// Removes and returns the head request, if any
    pub fn pop(&self) -> Option<JobRequest> {
        self.items.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Resolves once a push has happened since the last wait
    pub async fn pushed(&self) {
        self.added.notified().await;
    }
}

/// Outcome of one admission attempt
#[derive(Debug)]
pub enum Admission {
    /// The request may start; its in-flight entry is already marked
    Admit(JobRequest),

    /// The head request is gated on the previous level; it has been
    /// re-appended to the tail
    Blocked,

    /// The queue is empty
    Idle,
}

/// Decides whether pending work may enter the pool
///
/// Owns no tasks itself: admission is synchronous over the queue and the
/// coordination state, so the gating policy is testable without a pool.
pub struct Scheduler {
    queue: Arc<WorkQueue>,
    state: Arc<CrawlState>,
}

impl Scheduler {
    pub fn new(queue: Arc<WorkQueue>, state: Arc<CrawlState>) -> Self {
        Self { queue, state }
    }

    /// Attempts to admit the head of the queue
    ///
    /// On admission the request's category is marked in flight at its own
    /// (lineage, depth) before the request is handed back, so a later
    /// depth+1 request observes the gate even if the job has not started
    /// running yet.
    pub fn try_admit(&self) -> Admission {
        let Some(request) = self.queue.pop() else {
            return Admission::Idle;
        };

        if let Some(prev) = request.predecessor_key() {
            if self.state.is_blocked(&prev) {
                tracing::trace!(
                    "Deferring {} at level {}: level {} of {} still in flight",
                    request.category,
                    request.depth,
                    prev.depth,
                    request.lineage
                );
                self.queue.push(request);
                return Admission::Blocked;
            }
        }

        self.state.mark_in_flight(&request.key(), &request.category);
        Admission::Admit(request)
    }
}
