use crate::config::types::{ApiConfig, Config, CrawlConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "categories must name at least one root category".to_string(),
        ));
    }

    for category in &config.categories {
        if category.trim().is_empty() {
            return Err(ConfigError::Validation(
                "categories must not contain blank names".to_string(),
            ));
        }
    }

    if config.parallel_task_count < 1 || config.parallel_task_count > 64 {
        return Err(ConfigError::Validation(format!(
            "parallel-task-count must be between 1 and 64, got {}",
            config.parallel_task_count
        )));
    }

    if config.request_delay_seconds > 3600 {
        return Err(ConfigError::Validation(format!(
            "request-delay-seconds must be <= 3600, got {}",
            config.request_delay_seconds
        )));
    }

    if config.max_pages_per_level < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages-per-level must be >= 1, got {}",
            config.max_pages_per_level
        )));
    }

    if config.scheduler_poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "scheduler-poll-interval-ms must be >= 10ms, got {}ms",
            config.scheduler_poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api endpoint: {}", e)))?;

    Url::parse(&config.article_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid article-base: {}", e)))?;

    if config.article_base.ends_with('/') {
        return Err(ConfigError::Validation(
            "article-base must not end with '/'".to_string(),
        ));
    }

    // MediaWiki namespace prefixes are always colon-terminated
    if !config.category_prefix.ends_with(':') {
        return Err(ConfigError::Validation(format!(
            "category-prefix must end with ':', got '{}'",
            config.category_prefix
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if sanitized_csv_filename(&config.csv_filename).is_empty() {
        return Err(ConfigError::Validation(format!(
            "csv-filename must contain a file name, got '{}'",
            config.csv_filename
        )));
    }

    Ok(())
}

/// Strips path separators out of the configured CSV file name so it can only
/// ever land directly inside the data directory
pub fn sanitized_csv_filename(name: &str) -> String {
    name.chars().filter(|c| *c != '/' && *c != '\\').collect()
}
