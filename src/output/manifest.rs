//! CSV manifest formatting
//!
//! Every successfully downloaded page contributes one row. Rows are built by
//! category jobs as they run and concatenated into a single manifest at the
//! end of the crawl.

use url::form_urlencoded;

/// Fixed manifest header row
pub const CSV_HEADER: &str = "File id,Title,URL,Category,Level,Article size";

/// One manifest row describing a downloaded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    /// Hierarchical zero-padded id, e.g. "00_002_014"
    pub file_id: String,

    /// Page title as reported by the API
    pub title: String,

    /// Constructed article URL
    pub url: String,

    /// Two-digit root category number (first segment of `file_id`)
    pub category: String,

    /// Depth of the category this page was found in
    pub level: u32,

    /// Character count of the downloaded text
    pub size: usize,
}

impl ManifestRow {
    /// Renders the row as one CSV line (no trailing newline)
    ///
    /// The first three columns are double-quoted; the rest are bare numbers.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            quote(&self.file_id),
            quote(&self.title),
            quote(&self.url),
            self.category,
            self.level,
            self.size
        )
    }
}

/// Wraps a value in double quotes, doubling any embedded quotes
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Constructs the article URL for a page title
///
/// The title is form-encoded the way the wiki itself links articles: encoded
/// bytes, with spaces rendered as underscores.
pub fn article_url(article_base: &str, title: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(title.as_bytes()).collect();
    format!("{}/{}", article_base, encoded.replace('+', "_"))
}

/// Concatenates the header and every non-empty fragment, in the order given
pub fn assemble_manifest<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    let mut manifest = String::from(CSV_HEADER);
    manifest.push('\n');
    for fragment in fragments {
        if !fragment.is_empty() {
            manifest.push_str(fragment);
        }
    }
    manifest
}
