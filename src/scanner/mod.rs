//! Scanner module: directory traversal and per-file error taxonomy.
//!
//! The walker enumerates regular files in a stable order, one at a time;
//! the pipeline consumes them. Everything here is strictly sequential by
//! design: one file is fully processed before the next is touched.

pub mod walker;

use std::io;
use std::path::PathBuf;

pub use walker::Walker;

/// A regular file discovered by the walker.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Size in bytes from metadata. The pipeline re-measures while
    /// streaming; this value only drives pre-filters.
    pub size: u64,
}

impl FileEntry {
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Minimum file size to include, in bytes. Empty files are always
    /// skipped regardless of this setting.
    pub min_size: Option<u64>,

    /// Do not descend past filesystem boundaries. Hard links cannot cross
    /// them, so anything on another filesystem could never be linked.
    pub one_file_system: bool,
}

/// Errors that can occur while scanning files.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The file could not be opened for reading.
    #[error("could not open {path} for reading: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the file's content failed mid-stream.
    #[error("reading from {path} failed: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The traversal itself failed at a directory or entry.
    #[error("could not scan {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
