//! Output module for the crawl tree and the CSV manifest
//!
//! This module handles:
//! - Lifecycle of the on-disk data directory (reset, page writes, teardown)
//! - CSV manifest formatting (header, row quoting, article URLs)

mod manifest;
mod page_store;

pub use manifest::{article_url, assemble_manifest, ManifestRow, CSV_HEADER};
pub use page_store::{sanitize_component, PageStore};
