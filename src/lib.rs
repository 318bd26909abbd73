//! Wikigrove: a level-synchronized category-tree crawler
//!
//! This crate implements a breadth-first crawler over a MediaWiki category
//! tree. Independent subtrees are processed by a bounded worker pool, with the
//! guarantee that no category at depth L starts before every same-lineage
//! category at depth L-1 has finished. Downloaded pages land in a numbered
//! directory tree plus one flat CSV manifest.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Wikigrove operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Category '{category}' returned no pages and no subcategories")]
    EmptyCategory { category: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by the remote category/content API adapter
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Bad response status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed API reply from {url}: {message}")]
    MalformedReply { url: String, message: String },
}

/// Result type alias for Wikigrove operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for fetch adapter operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CategorySource, JobRequest};
pub use state::{CrawlState, LevelKey};
