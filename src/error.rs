//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the dupelink application.
///
/// - 0: Success (completed, at least one duplicate handled)
/// - 1: General error (unexpected failure, run aborted)
/// - 2: Nothing to link (completed normally, no duplicates found)
/// - 3: Partial success (completed with some non-fatal per-file errors)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Scan completed and duplicates were found (and linked, unless dry-run).
    Success = 0,
    /// An unexpected error aborted the run.
    GeneralError = 1,
    /// Scan completed but no duplicate content was found.
    NothingToLink = 2,
    /// Scan completed but some files or replacements failed.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DL000",
            Self::GeneralError => "DL001",
            Self::NothingToLink => "DL002",
            Self::PartialSuccess => "DL003",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DL001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
