//! Sequential directory walker built on walkdir.
//!
//! # Overview
//!
//! Enumerates the regular files under a root, top to bottom, in sorted
//! order. Entries whose name begins with `.` are pruned before they reach
//! the pipeline, directories included, so a dot-directory's entire subtree
//! is invisible to the scan. Symlinks are never followed and never yielded.
//!
//! Paths that are hard links to an inode already seen earlier in the walk
//! are skipped up front: they already share storage with their first
//! occurrence, so fingerprinting them again could only waste I/O or,
//! worse, relink a file to itself.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/data/photos"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("warning: {e}"),
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Character marking entries the walk must not touch.
const RESERVED_MARKER: char = '.';

/// Sequential walker yielding regular files under one root.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a walker for the given root directory.
    #[must_use]
    pub fn new(root: &Path, config: WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    /// Whether an entry's file name starts with the reserved marker.
    fn is_marked(entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(RESERVED_MARKER))
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        // Linking empty files saves nothing and would collapse unrelated
        // paths onto one inode.
        if size == 0 {
            return false;
        }
        self.config.min_size.is_none_or(|min| size >= min)
    }

    /// Walk the tree, yielding file entries in sorted order.
    ///
    /// Traversal errors are yielded as [`ScanError::Walk`] values rather
    /// than stopping iteration; the caller logs them and continues.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let mut seen_inodes: HashSet<InodeKey> = HashSet::new();

        WalkDir::new(&self.root)
            .follow_links(false)
            .same_file_system(self.config.one_file_system)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !Self::is_marked(entry))
            .filter_map(move |entry_result| {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e
                            .path()
                            .map_or_else(|| self.root.clone(), Path::to_path_buf);
                        return Some(Err(ScanError::Walk { path, source: e }));
                    }
                };

                // Regular files only; directories and symlinks never reach
                // the pipeline.
                if !entry.file_type().is_file() {
                    return None;
                }

                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        return Some(Err(ScanError::Walk {
                            path: entry.path().to_path_buf(),
                            source: e,
                        }));
                    }
                };

                let size = metadata.len();
                if !self.passes_size_filter(size) {
                    log::trace!(
                        "Skipping {} (size {} below threshold)",
                        entry.path().display(),
                        size
                    );
                    return None;
                }

                if let Some(key) = InodeKey::from_metadata(&metadata) {
                    if !seen_inodes.insert(key) {
                        log::debug!(
                            "Skipping {}: already hard linked to a scanned file",
                            entry.path().display()
                        );
                        return None;
                    }
                }

                Some(Ok(FileEntry::new(entry.into_path(), size)))
            })
    }
}

/// Device + inode pair identifying a file's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InodeKey {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(not(unix))]
    _unsupported: (),
}

impl InodeKey {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    // Without inode identity every path is treated as distinct; duplicates
    // among existing hard links are then caught by content anyway.
    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}
