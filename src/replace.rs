//! Safe replacement of a duplicate file with a hard link.
//!
//! # Overview
//!
//! Converting a duplicate into a hard link takes three filesystem steps,
//! any of which can fail: move the duplicate aside to a backup name, create
//! the link at the original name, delete the backup. The protocol here
//! guarantees that the only copy of the duplicate's bytes is never lost:
//! the backup always exists before the destructive link attempt, and it is
//! only deleted once the link is in place.
//!
//! ```text
//! START ──rename p → p.bak──▶ BACKED_UP ──link p → q──▶ LINKED ──delete p.bak──▶ DONE
//!   │ fail: RenameFailed          │ fail: restore backup     │ fail: StaleBackupLeftBehind
//!   ▼                             ▼                          ▼
//! p untouched          restored: LinkFailed          link kept, backup lingers
//!                      restore fail: OrphanedBackup
//! ```
//!
//! Every failure is a distinct [`ReplaceError`] naming the affected paths,
//! so the caller can report exactly what manual cleanup, if any, is needed.

use std::io;
use std::path::{Path, PathBuf};

/// Suffix appended to a duplicate's path while its bytes are parked.
pub const BACKUP_SUFFIX: &str = ".bak";

/// The filesystem operations the replace protocol needs.
///
/// Production code uses [`RealFs`]; tests inject failures through a mock
/// implementation to drive every branch of the protocol.
pub trait FsPrimitives {
    /// Rename `from` to `to`, replacing nothing.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a hard link at `at` pointing to the content of `target`.
    fn hard_link(&self, target: &Path, at: &Path) -> io::Result<()>;

    /// Delete the file at `path`.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`FsPrimitives`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FsPrimitives for RealFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn hard_link(&self, target: &Path, at: &Path) -> io::Result<()> {
        std::fs::hard_link(target, at)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Failures of the replace protocol.
///
/// All variants are recoverable at the process level: the walk continues
/// with the next file. [`OrphanedBackup`](ReplaceError::OrphanedBackup) and
/// [`StaleBackupLeftBehind`](ReplaceError::StaleBackupLeftBehind) leave the
/// tree in a consistent but unfinished state the user must clean up.
#[derive(thiserror::Error, Debug)]
pub enum ReplaceError {
    /// The duplicate could not be moved aside; it is untouched.
    #[error("could not move {path} to backup {backup}: {source}")]
    RenameFailed {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Linking failed and the backup was restored; the duplicate is back
    /// under its original name, unlinked.
    #[error("could not create hard link at {path} to {target} (original restored): {source}")]
    LinkFailed {
        path: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Linking failed and restoring the backup also failed. The original
    /// path is missing; the file's bytes live only at the backup path.
    #[error(
        "could not create hard link at {path} to {target} ({link_error}), and restoring \
         the backup failed; the file's content is at {backup} and must be moved back manually"
    )]
    OrphanedBackup {
        path: PathBuf,
        target: PathBuf,
        backup: PathBuf,
        link_error: io::Error,
        #[source]
        source: io::Error,
    },

    /// The link is in place but the backup could not be deleted, so no
    /// space is reclaimed until it is removed manually.
    #[error("{path} now links to {target}, but the backup {backup} could not be removed: {source}")]
    StaleBackupLeftBehind {
        path: PathBuf,
        target: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReplaceError {
    /// Whether this failure left a file under a name the user must fix by
    /// hand (as opposed to a clean abort or rollback).
    #[must_use]
    pub fn needs_manual_recovery(&self) -> bool {
        matches!(
            self,
            Self::OrphanedBackup { .. } | Self::StaleBackupLeftBehind { .. }
        )
    }
}

/// Backup name for a path: the original with [`BACKUP_SUFFIX`] appended.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Replace the duplicate at `path` with a hard link to `target`.
///
/// On success the duplicate's former bytes are gone, `path` resolves to
/// `target`'s content, and no backup remains. On failure the error variant
/// states exactly which of the four possible end states the tree is in;
/// in no case are both `path` and its backup absent.
///
/// # Errors
///
/// See [`ReplaceError`].
pub fn replace_with_link<F: FsPrimitives>(
    fs: &F,
    path: &Path,
    target: &Path,
) -> Result<(), ReplaceError> {
    let backup = backup_path(path);

    // START -> BACKED_UP. A failure here leaves the duplicate untouched.
    fs.rename(path, &backup)
        .map_err(|source| ReplaceError::RenameFailed {
            path: path.to_path_buf(),
            backup: backup.clone(),
            source,
        })?;

    // BACKED_UP -> LINKED, with the rollback branch on failure.
    if let Err(link_error) = fs.hard_link(target, path) {
        return Err(match fs.rename(&backup, path) {
            Ok(()) => ReplaceError::LinkFailed {
                path: path.to_path_buf(),
                target: target.to_path_buf(),
                source: link_error,
            },
            Err(restore_error) => ReplaceError::OrphanedBackup {
                path: path.to_path_buf(),
                target: target.to_path_buf(),
                backup,
                link_error,
                source: restore_error,
            },
        });
    }

    // LINKED -> DONE. The link is already in place; only the backup's
    // removal can still fail.
    fs.remove_file(&backup)
        .map_err(|source| ReplaceError::StaleBackupLeftBehind {
            path: path.to_path_buf(),
            target: target.to_path_buf(),
            backup,
            source,
        })?;

    Ok(())
}
