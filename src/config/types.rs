use serde::Deserialize;

/// Main configuration structure for Wikigrove
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub api: ApiConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Ordered list of root category names (without namespace prefix)
    pub categories: Vec<String>,

    /// Size of the worker pool processing categories in parallel
    #[serde(rename = "parallel-task-count")]
    pub parallel_task_count: u32,

    /// Delay after each page download within one category job (seconds)
    #[serde(rename = "request-delay-seconds")]
    pub request_delay_seconds: u64,

    /// Pruning cap: a lineage stops expanding once the previous level
    /// downloaded more pages than this
    #[serde(rename = "max-pages-per-level")]
    pub max_pages_per_level: u64,

    /// Fallback wakeup interval for the scheduler's gate wait (milliseconds)
    #[serde(rename = "scheduler-poll-interval-ms", default = "default_poll_interval")]
    pub scheduler_poll_interval_ms: u64,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// MediaWiki API endpoint, e.g. "https://en.wikipedia.org/w/api.php"
    pub endpoint: String,

    /// Base for constructed article URLs, e.g. "https://en.wikipedia.org/wiki"
    #[serde(rename = "article-base")]
    pub article_base: String,

    /// Namespace prefix prepended to configured root category names,
    /// e.g. "Category:"
    #[serde(rename = "category-prefix", default = "default_category_prefix")]
    pub category_prefix: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Parent directory of the crawl tree; page data lands in
    /// `<directory>/crawled_data`
    pub directory: String,

    /// Name of the CSV manifest file written next to the category directories
    #[serde(rename = "csv-filename")]
    pub csv_filename: String,
}

fn default_poll_interval() -> u64 {
    100
}

fn default_category_prefix() -> String {
    "Category:".to_string()
}
