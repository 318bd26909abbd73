//! On-disk lifecycle of the crawl tree
//!
//! The store owns a single `crawled_data` directory. Category jobs write page
//! text files into per-category subdirectories beneath it; the manifest is
//! written next to those subdirectories when the crawl finishes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the directory created beneath the configured output directory.
/// Reset and teardown only ever delete this child, never the configured
/// directory itself.
const DATA_DIR_NAME: &str = "crawled_data";

/// Handle to the output directory tree
#[derive(Debug, Clone)]
pub struct PageStore {
    root: PathBuf,
}

impl PageStore {
    /// Creates a store rooted at `<output_directory>/crawled_data`
    pub fn new(output_directory: impl AsRef<Path>) -> Self {
        Self {
            root: output_directory.as_ref().join(DATA_DIR_NAME),
        }
    }

    /// The data directory all pages and the manifest live under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deletes any previous crawl tree and recreates an empty root
    pub fn reset(&self) -> io::Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)?;
        tracing::info!("Created data directory {}", self.root.display());
        Ok(())
    }

    /// Deletes the whole crawl tree; used on the fatal empty-category path
    pub fn remove(&self) -> io::Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
            tracing::info!("Deleted data directory {}", self.root.display());
        }
        Ok(())
    }

    /// Writes one page's text under `dir` as `{file_id}_{title}.txt`
    ///
    /// The category directory is created on first use. Path separators in the
    /// title are replaced by spaces so the title can never escape `dir`.
    pub fn save_page(
        &self,
        dir: &Path,
        file_id: &str,
        title: &str,
        text: &str,
    ) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}_{}.txt", file_id, sanitize_component(title)));
        fs::write(&path, text.as_bytes())?;
        Ok(path)
    }

    /// Writes the final CSV manifest into the data directory
    pub fn write_manifest(&self, filename: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.root.join(filename);
        fs::write(&path, contents.as_bytes())?;
        tracing::info!("Csv manifest written to {}", path.display());
        Ok(path)
    }
}

/// Replaces path separators in a name with spaces
pub fn sanitize_component(name: &str) -> String {
    name.replace(['/', '\\'], " ")
}
