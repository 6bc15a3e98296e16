//! Per-file scan pipeline and run counters.
//!
//! # Overview
//!
//! [`Deduplicator`] owns everything a run mutates: the duplicate index,
//! the counters, and the replace options. The walker feeds it one path at
//! a time; for each file it streams the content into a fingerprint, asks
//! the index for the nearest existing entry, and either records the file
//! as new content or hands it to the replace protocol.
//!
//! Per-file failures (open, read, replace) are logged and skip the file;
//! the walk always continues. Index contract violations are different:
//! they mean the structure can no longer be trusted, so they propagate out
//! and abort the run.
//!
//! # Counter semantics
//!
//! - `files_scanned` counts files whose fingerprinting completed,
//!   whatever happened afterwards.
//! - `duplicates_found` counts exact-content matches discovered.
//! - `files_linked` and `bytes_saved` move only when a replacement runs
//!   the full protocol to completion, backup deletion included. A rolled
//!   back link or a lingering backup leaves them untouched.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;

use crate::fingerprint::{fingerprint_reader, Blake3Fingerprinter, READ_CHUNK_SIZE};
use crate::index::{DuplicateIndex, IndexError};
use crate::replace::{replace_with_link, FsPrimitives, RealFs};
use crate::scanner::ScanError;

/// Options controlling how duplicates are handled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupOptions {
    /// Detect and report duplicates without touching the filesystem.
    pub dry_run: bool,
    /// Verify byte equality before linking instead of trusting the
    /// fingerprint.
    pub paranoid: bool,
}

/// Counters for one run. All updates happen in [`Deduplicator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Files whose content was fully fingerprinted.
    pub files_scanned: u64,
    /// Files replaced by a hard link, protocol run to completion.
    pub files_linked: u64,
    /// Sum of the streamed sizes of all fully linked files.
    pub bytes_saved: u64,
    /// Exact-content duplicates discovered (linked or not).
    pub duplicates_found: u64,
    /// Files skipped on open/read failures or detected collisions.
    pub files_skipped: u64,
    /// Replacements that failed partway; see the log for each path.
    pub replace_errors: u64,
    /// Traversal errors (unreadable directories and the like).
    pub walk_errors: u64,
}

impl ScanStats {
    /// Whether any non-fatal error occurred during the run.
    #[must_use]
    pub fn had_errors(&self) -> bool {
        self.files_skipped > 0 || self.replace_errors > 0 || self.walk_errors > 0
    }
}

/// What the pipeline did with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// New content; the file is now the representative for its fingerprint.
    Indexed,
    /// Duplicate replaced by a hard link, backup removed.
    Linked,
    /// Duplicate found in dry-run mode; nothing touched.
    WouldLink,
    /// Duplicate found but the replacement failed partway.
    ReplaceFailed,
    /// File skipped (open/read failure or fingerprint collision).
    Skipped,
}

/// One run's pipeline state: index, counters, options.
#[derive(Debug)]
pub struct Deduplicator<F: FsPrimitives = RealFs> {
    index: DuplicateIndex,
    stats: ScanStats,
    options: DedupOptions,
    fs: F,
}

impl Deduplicator<RealFs> {
    /// Create a pipeline operating on the real filesystem.
    #[must_use]
    pub fn new(options: DedupOptions) -> Self {
        Self::with_fs(options, RealFs)
    }
}

impl<F: FsPrimitives> Deduplicator<F> {
    /// Create a pipeline with injected filesystem primitives.
    #[must_use]
    pub fn with_fs(options: DedupOptions, fs: F) -> Self {
        Self {
            index: DuplicateIndex::new(),
            stats: ScanStats::default(),
            options,
            fs,
        }
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Consume the pipeline, returning the final counters.
    #[must_use]
    pub fn into_stats(self) -> ScanStats {
        self.stats
    }

    /// Number of distinct fingerprints indexed so far.
    #[must_use]
    pub fn indexed_files(&self) -> usize {
        self.index.len()
    }

    /// Record a traversal error reported by the walker.
    pub fn record_walk_error(&mut self, err: &ScanError) {
        log::warn!("{err}");
        self.stats.walk_errors += 1;
    }

    /// Run one file through the pipeline.
    ///
    /// # Errors
    ///
    /// Only [`IndexError`]: a contract violation in the duplicate index,
    /// which aborts the run. Per-file I/O and replace failures are logged
    /// and reflected in the returned [`FileOutcome`] and the counters.
    pub fn process_file(&mut self, path: &Path) -> Result<FileOutcome, IndexError> {
        // Step 1: open. Failure skips the file with no counter movement.
        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) => {
                let err = ScanError::OpenFailed {
                    path: path.to_path_buf(),
                    source,
                };
                log::warn!("{err}");
                self.stats.files_skipped += 1;
                return Ok(FileOutcome::Skipped);
            }
        };

        // Step 2: stream the content into a fingerprint, counting bytes.
        // The handle is released on every exit path when `file` drops.
        let (fingerprint, size) = match fingerprint_reader(file, Blake3Fingerprinter::default()) {
            Ok(result) => result,
            Err(source) => {
                let err = ScanError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                };
                log::warn!("{err}");
                self.stats.files_skipped += 1;
                return Ok(FileOutcome::Skipped);
            }
        };

        // Step 3: fingerprinting completed.
        self.stats.files_scanned += 1;

        // Step 4: first entry seeds the index.
        if self.index.is_empty() {
            self.index.insert(fingerprint, path.to_path_buf(), None)?;
            return Ok(FileOutcome::Indexed);
        }

        // Step 5: nearest candidate decides duplicate vs. distinct.
        let (divergence, candidate) = {
            let nearest = self.index.find_nearest(&fingerprint)?;
            (
                nearest.key.divergence(&fingerprint),
                nearest.path.to_path_buf(),
            )
        };

        match divergence {
            Some(bit) => {
                self.index
                    .insert(fingerprint, path.to_path_buf(), Some(bit))?;
                Ok(FileOutcome::Indexed)
            }
            None => Ok(self.handle_duplicate(path, &candidate, size)),
        }
    }

    /// Handle a file whose fingerprint matches the representative at
    /// `candidate`.
    fn handle_duplicate(&mut self, path: &Path, candidate: &Path, size: u64) -> FileOutcome {
        if self.options.paranoid {
            match contents_match(path, candidate) {
                Ok(true) => {}
                Ok(false) => {
                    log::error!(
                        "Fingerprint collision: {} and {} hash alike but differ; leaving both",
                        path.display(),
                        candidate.display()
                    );
                    self.stats.files_skipped += 1;
                    return FileOutcome::Skipped;
                }
                Err(source) => {
                    let err = ScanError::ReadFailed {
                        path: path.to_path_buf(),
                        source,
                    };
                    log::warn!("Verification failed, leaving file alone: {err}");
                    self.stats.files_skipped += 1;
                    return FileOutcome::Skipped;
                }
            }
        }

        self.stats.duplicates_found += 1;

        if self.options.dry_run {
            log::info!(
                "Would replace {} with link to {} ({size} bytes)",
                path.display(),
                candidate.display()
            );
            return FileOutcome::WouldLink;
        }

        log::info!(
            "Replacing {} with link to {}",
            path.display(),
            candidate.display()
        );
        match replace_with_link(&self.fs, path, candidate) {
            Ok(()) => {
                self.stats.files_linked += 1;
                self.stats.bytes_saved += size;
                FileOutcome::Linked
            }
            Err(err) => {
                if err.needs_manual_recovery() {
                    log::error!("{err}");
                } else {
                    log::warn!("{err}");
                }
                self.stats.replace_errors += 1;
                FileOutcome::ReplaceFailed
            }
        }
    }
}

/// Compare two files byte by byte.
fn contents_match(a: &Path, b: &Path) -> std::io::Result<bool> {
    let mut reader_a = BufReader::with_capacity(READ_CHUNK_SIZE, File::open(a)?);
    let mut reader_b = BufReader::with_capacity(READ_CHUNK_SIZE, File::open(b)?);
    let mut buf_a = vec![0u8; READ_CHUNK_SIZE];
    let mut buf_b = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let n_a = read_full(&mut reader_a, &mut buf_a)?;
        let n_b = read_full(&mut reader_b, &mut buf_b)?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows; returns bytes read (0 at EOF).
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
