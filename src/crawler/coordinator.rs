//! Crawl coordinator - the control loop over the worker pool
//!
//! This module contains the main crawl loop that:
//! - Seeds the work queue with one request per configured root category
//! - Admits gated work through the scheduler into a bounded task pool
//! - Collects every job's CSV fragment as completions arrive
//! - Assembles the final manifest in submission order
//! - Stops the run when a job reports the fatal empty-category condition

use crate::config::Config;
use crate::crawler::fetcher::CategorySource;
use crate::crawler::job::{CategoryJob, CrawlContext};
use crate::crawler::scheduler::{Admission, JobRequest, Scheduler, WorkQueue};
use crate::output::{assemble_manifest, PageStore};
use crate::state::CrawlState;
use crate::{CrawlError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Submission index plus the job's outcome
type JobOutcome = (usize, Result<String>);

/// Owns the scheduler, the shared job context, and the worker pool
pub struct Coordinator {
    scheduler: Scheduler,
    ctx: Arc<CrawlContext>,
    limiter: Arc<Semaphore>,
    poll_interval: Duration,
}

impl Coordinator {
    /// Creates a coordinator and seeds the queue from the configuration
    pub fn new(config: &Config, source: Arc<dyn CategorySource>, store: Arc<PageStore>) -> Self {
        let state = Arc::new(CrawlState::new());
        let queue = Arc::new(WorkQueue::new());

        // One depth-0 request per configured root category, in order
        for (index, name) in config.crawl.categories.iter().enumerate() {
            let name = name.trim();
            let category = format!("{}{}", config.api.category_prefix, name);
            queue.push(JobRequest::root(index, &category, name, store.root()));
        }

        let ctx = Arc::new(CrawlContext {
            state: Arc::clone(&state),
            queue: Arc::clone(&queue),
            source,
            store,
            delay: Duration::from_secs(config.crawl.request_delay_seconds),
            max_pages_per_level: config.crawl.max_pages_per_level,
            article_base: config.api.article_base.clone(),
            category_prefix: config.api.category_prefix.clone(),
        });

        Self {
            scheduler: Scheduler::new(queue, state),
            ctx,
            limiter: Arc::new(Semaphore::new(config.crawl.parallel_task_count as usize)),
            poll_interval: Duration::from_millis(config.crawl.scheduler_poll_interval_ms),
        }
    }

    /// Runs the crawl to completion and returns the assembled manifest text
    ///
    /// The loop exits once the queue is empty and no job is active. A job
    /// returning `EmptyCategory` aborts the remaining pool and propagates;
    /// a panicked job is logged and the rest of the run continues.
    pub async fn run(&mut self) -> Result<String> {
        let started = std::time::Instant::now();
        let mut jobs: JoinSet<JobOutcome> = JoinSet::new();
        let mut fragments: Vec<Option<String>> = Vec::new();
        let mut fatal: Option<CrawlError> = None;

        'control: loop {
            // Collect whatever has already finished, without blocking
            while let Some(joined) = jobs.try_join_next() {
                if let Err(e) = record(&mut fragments, joined) {
                    fatal = Some(e);
                    break 'control;
                }
            }

            match self.scheduler.try_admit() {
                Admission::Admit(request) => {
                    // The pool permit is the only backpressure in the system;
                    // the queue itself never blocks producers.
                    let Ok(permit) = Arc::clone(&self.limiter).acquire_owned().await else {
                        break;
                    };

                    let index = fragments.len();
                    fragments.push(None);

                    tracing::debug!(
                        "Starting job #{}: {} (level {})",
                        index,
                        request.category,
                        request.depth
                    );
                    let job = CategoryJob::new(request, Arc::clone(&self.ctx));
                    jobs.spawn(async move {
                        let _permit = permit;
                        (index, job.run().await)
                    });
                }

                Admission::Blocked => {
                    // Head of the queue is gated on its previous level. Wake
                    // on a gate release, a completion, or the poll-interval
                    // fallback, whichever comes first.
                    tokio::select! {
                        _ = self.ctx.state.released() => {}
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                            if let Err(e) = record(&mut fragments, joined) {
                                fatal = Some(e);
                                break 'control;
                            }
                        }
                    }
                }

                Admission::Idle => {
                    if jobs.is_empty() {
                        // Queue empty and pool drained: the crawl is done
                        break;
                    }
                    // Active jobs may still push subcategory requests; wait
                    // for either a completion or new work.
                    tokio::select! {
                        Some(joined) = jobs.join_next() => {
                            if let Err(e) = record(&mut fragments, joined) {
                                fatal = Some(e);
                                break 'control;
                            }
                        }
                        _ = self.ctx.queue.pushed() => {}
                    }
                }
            }
        }

        if let Some(fatal) = fatal {
            // Hard stop: abandon whatever is still in flight
            jobs.shutdown().await;
            return Err(fatal);
        }

        // Await the stragglers admitted in the final iterations
        while let Some(joined) = jobs.join_next().await {
            if let Err(e) = record(&mut fragments, joined) {
                jobs.shutdown().await;
                return Err(e);
            }
        }

        tracing::info!(
            "Tasks finished: {} jobs in {:?}",
            fragments.len(),
            started.elapsed()
        );

        Ok(assemble_manifest(
            fragments.iter().filter_map(|f| f.as_deref()),
        ))
    }
}

/// Files one joined task into the fragment table
///
/// Panicked jobs are logged and swallowed so one crash cannot abort
/// collection of the others; a job-level error (the empty-category failure)
/// is returned to the caller.
fn record(
    fragments: &mut [Option<String>],
    joined: std::result::Result<JobOutcome, JoinError>,
) -> Result<()> {
    match joined {
        Ok((index, Ok(fragment))) => {
            fragments[index] = Some(fragment);
            Ok(())
        }
        Ok((_, Err(e))) => Err(e),
        Err(join_error) => {
            tracing::error!("Category job aborted: {}", join_error);
            Ok(())
        }
    }
}
