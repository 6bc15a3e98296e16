//! Command-line interface definitions for dupelink.
//!
//! The tool does exactly one thing, so there are no subcommands: a root
//! path to deduplicate plus flags controlling filtering, verification,
//! and output.
//!
//! # Example
//!
//! ```bash
//! # Replace duplicates under ~/archive with hard links
//! dupelink ~/archive
//!
//! # See what would happen first
//! dupelink --dry-run ~/archive
//!
//! # Byte-verify every match before linking, JSON summary
//! dupelink --paranoid --output json ~/archive
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replace duplicate files with hard links.
///
/// dupelink walks a directory tree once, fingerprints every regular
/// file's content, and replaces byte-identical copies with hard links to
/// the first copy seen, reclaiming the duplicated disk space.
#[derive(Debug, Parser)]
#[command(name = "dupelink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory tree to deduplicate
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Report duplicates without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verify matches byte-by-byte before linking
    ///
    /// Slower, but immune to fingerprint collisions.
    #[arg(long)]
    pub paranoid: bool,

    /// Do not cross filesystem boundaries
    ///
    /// Hard links cannot span filesystems, so subtrees on other mounts
    /// are skipped rather than scanned in vain.
    #[arg(long)]
    pub one_file_system: bool,

    /// Minimum file size to consider (e.g., 4KiB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB.
    /// Empty files are always skipped.
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Summary format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Emit errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

/// Summary format for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes B, KB, KiB, MB, MiB, GB, GiB, TB, TiB,
/// case-insensitive; a bare number is taken as bytes. Decimal suffixes
/// are powers of 1000, binary suffixes powers of 1024.
///
/// # Errors
///
/// Returns a human-readable message for empty input, unknown suffixes,
/// non-numeric values, and overflow.
///
/// # Examples
///
/// ```
/// use dupelink::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("2MiB").unwrap(), 2 * 1024 * 1024);
/// ```
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("size must not be empty".to_string());
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size number in '{trimmed}'"))?;

    let multiplier: u64 = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1000,
        "kib" => 1024,
        "mb" => 1000 * 1000,
        "mib" => 1024 * 1024,
        "gb" => 1000 * 1000 * 1000,
        "gib" => 1024 * 1024 * 1024,
        "tb" => 1000 * 1000 * 1000 * 1000,
        "tib" => 1024 * 1024 * 1024 * 1024,
        other => return Err(format!("unknown size suffix '{other}'")),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{trimmed}' is too large"))
}
