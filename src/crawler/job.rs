//! Category job: one execution per queued category
//!
//! A job enumerates its category's children through the fetch adapter,
//! downloads every leaf page under a fixed inter-request delay, appends one
//! manifest row per downloaded page, and queues one new request per
//! discovered subcategory. Whatever happens, the job releases its in-flight
//! gate entry on the way out.

use crate::crawler::fetcher::CategorySource;
use crate::crawler::scheduler::{JobRequest, WorkQueue};
use crate::output::{article_url, ManifestRow, PageStore};
use crate::state::CrawlState;
use crate::{CrawlError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared handles and settings every job runs against
pub struct CrawlContext {
    pub state: Arc<CrawlState>,
    pub queue: Arc<WorkQueue>,
    pub source: Arc<dyn CategorySource>,
    pub store: Arc<PageStore>,

    /// Delay slept after each page download within one job
    pub delay: Duration,

    /// Pruning cap on cumulative pages per (lineage, depth)
    pub max_pages_per_level: u64,

    /// Base for constructed article URLs
    pub article_base: String,

    /// Namespace prefix stripped from subcategory directory names
    pub category_prefix: String,
}

/// Children of a category, partitioned by type
struct Listing {
    /// Leaf page title -> page id; later duplicates of a title win
    pages: HashMap<String, u64>,

    /// Subcategory titles in API enumeration order
    subcategories: Vec<String>,
}

/// One unit of work processing a single category node
pub struct CategoryJob {
    request: JobRequest,
    ctx: Arc<CrawlContext>,
}

impl CategoryJob {
    pub fn new(request: JobRequest, ctx: Arc<CrawlContext>) -> Self {
        Self { request, ctx }
    }

    /// Runs the job to completion and returns its CSV fragment
    ///
    /// The in-flight entry marked at admission is cleared on every exit path,
    /// including the cap cutoff and the empty-category failure.
    pub async fn run(self) -> Result<String> {
        let key = self.request.key();
        let result = self.execute().await;
        self.ctx.state.clear_in_flight(&key, &self.request.category);
        result
    }

    async fn execute(&self) -> Result<String> {
        // Cap pruning: once the previous level of this lineage has produced
        // more pages than the cap, the whole subtree stops expanding. The
        // admission gate guarantees the previous-level count is final here.
        if let Some(prev) = self.request.predecessor_key() {
            let previous = self.ctx.state.level_count(&prev);
            if previous > self.ctx.max_pages_per_level {
                tracing::debug!(
                    "Skipping {}: level {} of {} already holds {} pages",
                    self.request.category,
                    prev.depth,
                    self.request.lineage,
                    previous
                );
                return Ok(String::new());
            }
        }

        let listing = self.enumerate_children().await;

        // A category with no members at all means a bad or misspelled name;
        // partial output would be misleading, so the whole crawl stops.
        if listing.pages.is_empty() && listing.subcategories.is_empty() {
            tracing::error!(
                "No data returned for category '{}'; check the category name",
                self.request.category
            );
            return Err(CrawlError::EmptyCategory {
                category: self.request.category.clone(),
            });
        }

        // Sorted titles give deterministic file-index assignment regardless
        // of API enumeration order.
        let mut titles: Vec<String> = listing.pages.keys().cloned().collect();
        titles.sort_unstable();
        let mut subcategories = listing.subcategories;
        subcategories.sort_unstable();

        let mut csv = String::new();
        let mut downloaded: u64 = 0;
        for (index, title) in titles.iter().enumerate() {
            let page_id = listing.pages[title];
            match self.download_page(title, page_id, index).await {
                Ok(row) => {
                    csv.push_str(&row.to_line());
                    csv.push('\n');
                    downloaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping page '{}': {}", title, e);
                }
            }
            tokio::time::sleep(self.ctx.delay).await;
        }

        // The count must be in place before the gate opens for the next
        // level; clear_in_flight happens after this returns.
        self.ctx
            .state
            .bump_level_count(&self.request.key(), downloaded);

        for (index, subcat) in subcategories.iter().enumerate() {
            self.ctx
                .queue
                .push(self.request.child(index, subcat, &self.ctx.category_prefix));
        }

        Ok(csv)
    }

    /// Pages through the category's members until the cursor is exhausted
    ///
    /// A failed listing request is logged and retried at the same cursor,
    /// without limit: a persistently failing upstream stalls this one job
    /// and its lineage, never the rest of the crawl.
    async fn enumerate_children(&self) -> Listing {
        let mut pages = HashMap::new();
        let mut subcategories = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let batch = match self
                .ctx
                .source
                .list_children(&self.request.category, cursor.as_deref())
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(
                        "Listing '{}' failed, retrying: {}",
                        self.request.category,
                        e
                    );
                    continue;
                }
            };

            for entry in batch.entries {
                if entry.is_article() {
                    if let Some(page_id) = entry.page_id {
                        pages.insert(entry.title, page_id);
                    }
                } else if entry.is_subcategory() {
                    subcategories.push(entry.title);
                }
            }

            match batch.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Listing {
            pages,
            subcategories,
        }
    }

    /// Downloads one page, persists its text, and builds its manifest row
    async fn download_page(&self, title: &str, page_id: u64, index: usize) -> Result<ManifestRow> {
        tracing::info!(
            "Downloading page '{}' (category: {}, lineage: {}, level: {})",
            title,
            self.request.category,
            self.request.lineage,
            self.request.depth
        );

        let content = self.ctx.source.fetch_content(page_id).await?;

        let file_id = format!("{}{:03}", self.request.prefix, index);
        self.ctx
            .store
            .save_page(&self.request.dir, &file_id, &content.title, &content.text)?;

        let url = article_url(&self.ctx.article_base, &content.title);
        let category = file_id
            .split('_')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(ManifestRow {
            url,
            category,
            level: self.request.depth,
            size: content.text.chars().count(),
            title: content.title,
            file_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{ChildBatch, ChildEntry, ChildKind, PageContent};
    use crate::{FetchError, FetchResult};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn page(title: &str, id: u64) -> ChildEntry {
        ChildEntry {
            title: title.to_string(),
            kind: ChildKind::Page,
            namespace: 0,
            page_id: Some(id),
        }
    }

    fn subcat(title: &str) -> ChildEntry {
        ChildEntry {
            title: title.to_string(),
            kind: ChildKind::Subcategory,
            namespace: 14,
            page_id: None,
        }
    }

    fn talk_page(title: &str, id: u64) -> ChildEntry {
        ChildEntry {
            namespace: 1,
            ..page(title, id)
        }
    }

    /// In-memory source: listings served in fixed batches (the cursor is the
    /// next batch index), page bodies keyed by id
    #[derive(Default)]
    struct MockSource {
        batches: HashMap<String, Vec<Vec<ChildEntry>>>,
        content: HashMap<u64, PageContent>,
        fail_content: HashSet<u64>,
        list_calls: AtomicUsize,
        content_calls: AtomicUsize,
    }

    impl MockSource {
        fn with_children(category: &str, entries: Vec<ChildEntry>) -> Self {
            let mut source = Self::default();
            source.batches.insert(category.to_string(), vec![entries]);
            source
        }

        fn add_content(&mut self, id: u64, title: &str, text: &str) {
            self.content.insert(
                id,
                PageContent {
                    title: title.to_string(),
                    text: text.to_string(),
                },
            );
        }
    }

    #[async_trait]
    impl CategorySource for MockSource {
        async fn list_children(
            &self,
            category: &str,
            cursor: Option<&str>,
        ) -> FetchResult<ChildBatch> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let batches = self.batches.get(category).cloned().unwrap_or_default();
            let index: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let entries = batches.get(index).cloned().unwrap_or_default();
            let next = (index + 1 < batches.len()).then(|| (index + 1).to_string());
            Ok(ChildBatch { entries, next })
        }

        async fn fetch_content(&self, page_id: u64) -> FetchResult<PageContent> {
            self.content_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_content.contains(&page_id) {
                return Err(FetchError::Status {
                    url: "mock://content".to_string(),
                    status: 500,
                });
            }
            self.content
                .get(&page_id)
                .cloned()
                .ok_or_else(|| FetchError::MalformedReply {
                    url: "mock://content".to_string(),
                    message: format!("no page {}", page_id),
                })
        }
    }

    /// Tests keep their own `Arc<MockSource>` so call counters stay
    /// observable after the context type-erases the source
    fn test_context(source: &Arc<MockSource>) -> (Arc<CrawlContext>, TempDir) {
        let out = TempDir::new().unwrap();
        let store = PageStore::new(out.path());
        store.reset().unwrap();
        let ctx = Arc::new(CrawlContext {
            state: Arc::new(CrawlState::new()),
            queue: Arc::new(WorkQueue::new()),
            source: Arc::clone(source) as Arc<dyn CategorySource>,
            store: Arc::new(store),
            delay: Duration::ZERO,
            max_pages_per_level: 1000,
            article_base: "https://en.wikipedia.org/wiki".to_string(),
            category_prefix: "Category:".to_string(),
        });
        (ctx, out)
    }

    fn root_request(ctx: &CrawlContext, name: &str) -> JobRequest {
        JobRequest::root(
            0,
            &format!("Category:{}", name),
            name,
            ctx.store.root(),
        )
    }

    async fn run_job(ctx: &Arc<CrawlContext>, request: JobRequest) -> Result<String> {
        ctx.state.mark_in_flight(&request.key(), &request.category);
        CategoryJob::new(request, Arc::clone(ctx)).run().await
    }

    #[tokio::test]
    async fn test_pages_downloaded_in_sorted_order() {
        let mut source = MockSource::with_children(
            "Category:Animals",
            vec![page("Zebra", 3), page("Aardvark", 1), page("Mongoose", 2)],
        );
        source.add_content(1, "Aardvark", "aardvark text");
        source.add_content(2, "Mongoose", "mongoose text!");
        source.add_content(3, "Zebra", "zebra");
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let request = root_request(&ctx, "Animals");
        let key = request.key();
        let dir = request.dir.clone();
        let csv = run_job(&ctx, request).await.unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            r#""00_000","Aardvark","https://en.wikipedia.org/wiki/Aardvark",00,0,13"#
        );
        assert!(lines[1].starts_with("\"00_001\",\"Mongoose\""));
        assert!(lines[2].starts_with("\"00_002\",\"Zebra\""));

        // Count recorded, gate released, files on disk
        assert_eq!(ctx.state.level_count(&key), 3);
        assert!(!ctx.state.is_blocked(&key));
        assert!(dir.join("00_000_Aardvark.txt").exists());
        assert!(dir.join("00_002_Zebra.txt").exists());
    }

    #[tokio::test]
    async fn test_pagination_accumulates_all_batches() {
        let mut source = MockSource::default();
        source.batches.insert(
            "Category:Animals".to_string(),
            vec![
                vec![page("Aardvark", 1), subcat("Category:Mammals")],
                vec![page("Zebra", 2), subcat("Category:Birds")],
            ],
        );
        source.add_content(1, "Aardvark", "a");
        source.add_content(2, "Zebra", "z");
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let csv = run_job(&ctx, root_request(&ctx, "Animals")).await.unwrap();

        assert_eq!(csv.lines().count(), 2);
        assert_eq!(ctx.queue.len(), 2);
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cap_pruning_performs_zero_fetches() {
        let source = MockSource::with_children("Category:Mammals", vec![page("Bat", 1)]);
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let root = root_request(&ctx, "Animals");
        let request = root.child(0, "Category:Mammals", "Category:");

        // Previous level already beyond the cap
        ctx.state
            .bump_level_count(&root.key(), ctx.max_pages_per_level + 200);

        let key = request.key();
        let csv = run_job(&ctx, request).await.unwrap();

        assert!(csv.is_empty());
        assert!(!ctx.state.is_blocked(&key));
        assert_eq!(ctx.state.level_count(&key), 0);
        // No network traffic at all
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.content_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_count_at_cap_boundary_still_runs() {
        // The cutoff is strictly greater-than: a previous level exactly at
        // the cap does not prune.
        let mut source = MockSource::with_children("Category:Mammals", vec![page("Bat", 1)]);
        source.add_content(1, "Bat", "bat text");
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let root = root_request(&ctx, "Animals");
        ctx.state
            .bump_level_count(&root.key(), ctx.max_pages_per_level);

        let request = root.child(0, "Category:Mammals", "Category:");
        let csv = run_job(&ctx, request).await.unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_empty_category_is_fatal() {
        let source = MockSource::with_children("Category:Typo", vec![]);
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let request = JobRequest::root(0, "Category:Typo", "Typo", ctx.store.root());
        let key = request.key();
        let result = run_job(&ctx, request).await;

        assert!(matches!(
            result,
            Err(CrawlError::EmptyCategory { category }) if category == "Category:Typo"
        ));
        // Gate released even on the failure path
        assert!(!ctx.state.is_blocked(&key));
    }

    #[tokio::test]
    async fn test_non_article_members_are_ignored() {
        let mut source = MockSource::with_children(
            "Category:Animals",
            vec![page("Aardvark", 1), talk_page("Talk:Aardvark", 5)],
        );
        source.add_content(1, "Aardvark", "a");
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let csv = run_job(&ctx, root_request(&ctx, "Animals")).await.unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.contains("\"Aardvark\""));
    }

    #[tokio::test]
    async fn test_failed_page_download_is_skipped() {
        let mut source = MockSource::with_children(
            "Category:Animals",
            vec![page("Aardvark", 1), page("Mongoose", 2), page("Zebra", 3)],
        );
        source.add_content(1, "Aardvark", "a");
        source.add_content(3, "Zebra", "z");
        source.fail_content.insert(2);
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let request = root_request(&ctx, "Animals");
        let key = request.key();
        let csv = run_job(&ctx, request).await.unwrap();

        // Mongoose is dropped; its index stays assigned, so Zebra is 002
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"00_000\",\"Aardvark\""));
        assert!(lines[1].starts_with("\"00_002\",\"Zebra\""));

        // Only successful downloads count toward the level total
        assert_eq!(ctx.state.level_count(&key), 2);
    }

    #[tokio::test]
    async fn test_subcategory_requests_sorted_and_nested() {
        let mut source = MockSource::with_children(
            "Category:Animals",
            vec![
                subcat("Category:Reptiles"),
                page("Aardvark", 1),
                subcat("Category:Birds"),
            ],
        );
        source.add_content(1, "Aardvark", "a");
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let request = root_request(&ctx, "Animals");
        let dir = request.dir.clone();
        run_job(&ctx, request).await.unwrap();

        let first = ctx.queue.pop().unwrap();
        let second = ctx.queue.pop().unwrap();
        assert!(ctx.queue.is_empty());

        // Sorted ascending: Birds before Reptiles
        assert_eq!(first.category, "Category:Birds");
        assert_eq!(first.lineage, "Category:Animals");
        assert_eq!(first.depth, 1);
        assert_eq!(first.prefix, "00_000_");
        assert_eq!(first.dir, dir.join("00_000_Birds"));

        assert_eq!(second.category, "Category:Reptiles");
        assert_eq!(second.prefix, "00_001_");
        assert_eq!(second.dir, dir.join("00_001_Reptiles"));
    }

    #[tokio::test]
    async fn test_duplicate_title_last_write_wins() {
        let mut source = MockSource::default();
        source.batches.insert(
            "Category:Animals".to_string(),
            vec![vec![page("Aardvark", 1)], vec![page("Aardvark", 9)]],
        );
        // Only the later id has content; a fetch of id 1 would fail
        source.add_content(9, "Aardvark", "second body");
        let source = Arc::new(source);
        let (ctx, _out) = test_context(&source);

        let csv = run_job(&ctx, root_request(&ctx, "Animals")).await.unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(",11"));
        // One title, one download, despite two listed ids
        assert_eq!(source.content_calls.load(Ordering::SeqCst), 1);
    }
}
