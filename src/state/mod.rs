//! State module for cross-job crawl coordination
//!
//! This module provides the shared bookkeeping every category job reads and
//! writes while the crawl runs.
//!
//! # Components
//!
//! - `LevelKey`: a (lineage, depth) coordinate in the category tree
//! - `CrawlState`: cumulative per-level page counts and the per-level
//!   in-flight sets used as the depth-ordering gate

mod level_state;

// Re-export main types
pub use level_state::{CrawlState, LevelKey};
