//! Crawler module for category-tree processing
//!
//! This module contains the core crawling logic, including:
//! - The work queue and the level-ordering admission gate
//! - The control loop driving a bounded pool of category jobs
//! - The per-category job (enumerate, download, emit subcategories)
//! - The MediaWiki fetch adapter

mod coordinator;
mod fetcher;
mod job;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{
    build_http_client, CategorySource, ChildBatch, ChildEntry, ChildKind, MediaWikiSource,
    PageContent,
};
pub use job::{CategoryJob, CrawlContext};
pub use scheduler::{Admission, JobRequest, Scheduler, WorkQueue};

use crate::config::{sanitized_csv_filename, Config};
use crate::output::PageStore;
use crate::{CrawlError, FetchError, Result};
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Wipe and recreate the data directory
/// 2. Build the HTTP client and the MediaWiki adapter
/// 3. Run the coordinator until the category tree is exhausted
/// 4. Write the CSV manifest next to the downloaded pages
///
/// On the fatal empty-category condition the partial output tree is deleted
/// before the error is returned.
///
/// # Arguments
///
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Ok(())` - Crawl completed and the manifest was assembled
/// * `Err(CrawlError)` - Startup failed or a category turned out empty
pub async fn crawl(config: Config) -> Result<()> {
    let store = Arc::new(PageStore::new(&config.output.directory));
    store.reset()?;

    let client = build_http_client().map_err(FetchError::from)?;
    let source: Arc<dyn CategorySource> =
        Arc::new(MediaWikiSource::new(client, config.api.endpoint.clone()));

    let mut coordinator = Coordinator::new(&config, source, Arc::clone(&store));
    match coordinator.run().await {
        Ok(manifest) => {
            let filename = sanitized_csv_filename(&config.output.csv_filename);
            // A failed manifest write loses the summary, not the pages;
            // logged and absorbed like any other local write failure.
            if let Err(e) = store.write_manifest(&filename, &manifest) {
                tracing::error!("Cannot write csv manifest: {}", e);
            }
            Ok(())
        }
        Err(e) => {
            if matches!(e, CrawlError::EmptyCategory { .. }) {
                if let Err(io) = store.remove() {
                    tracing::error!(
                        "Cannot delete directory {}: {}",
                        store.root().display(),
                        io
                    );
                }
            }
            Err(e)
        }
    }
}
