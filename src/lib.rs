//! dupelink - Replace duplicate files with hard links
//!
//! Walks a directory tree once, fingerprints every regular file's content
//! (BLAKE3, truncated to 128 bits), and replaces byte-identical copies
//! with hard links to the first copy seen. Every original path keeps
//! resolving; the duplicated disk blocks are reclaimed.
//!
//! The interesting machinery lives in [`index`] (a crit-bit trie keyed on
//! content fingerprints) and [`replace`] (a backup-first link protocol
//! that cannot lose data partway).

pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod logging;
pub mod pipeline;
pub mod replace;
pub mod report;
pub mod scanner;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::pipeline::{DedupOptions, Deduplicator};
use crate::report::RunSummary;
use crate::scanner::{Walker, WalkerConfig};

/// Run the application with parsed CLI arguments.
///
/// Returns the exit code for a completed run; `Err` means the run aborted
/// (bad root path, index corruption, summary write failure).
///
/// # Errors
///
/// Any fatal condition, wrapped with context naming what failed.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || cli.output == OutputFormat::Json {
        yansi::disable();
    }

    let root = cli
        .path
        .canonicalize()
        .with_context(|| format!("cannot resolve path '{}'", cli.path.display()))?;
    anyhow::ensure!(root.is_dir(), "'{}' is not a directory", root.display());

    // Config file supplies defaults; CLI flags win.
    let config = Config::load();
    let walker_config = WalkerConfig {
        min_size: cli.min_size.or(config.min_size),
        one_file_system: cli.one_file_system || config.one_file_system,
    };
    let options = DedupOptions {
        dry_run: cli.dry_run,
        paranoid: cli.paranoid || config.paranoid,
    };

    if options.dry_run {
        log::info!("Dry run: scanning {} without changes", root.display());
    } else {
        log::info!("Deduplicating {}", root.display());
    }

    let walker = Walker::new(&root, walker_config);
    let mut dedup = Deduplicator::new(options);

    for entry in walker.walk() {
        match entry {
            Ok(file) => {
                dedup
                    .process_file(&file.path)
                    .context("duplicate index corrupted, aborting")?;
            }
            Err(e) => dedup.record_walk_error(&e),
        }
    }

    let stats = dedup.into_stats();
    let summary = RunSummary::new(stats, cli.dry_run);

    let stdout = std::io::stdout();
    match cli.output {
        OutputFormat::Text => {
            if !cli.quiet {
                summary
                    .write_text(&mut stdout.lock())
                    .context("failed to write summary")?;
            }
        }
        OutputFormat::Json => {
            use std::io::Write;
            let json = summary.to_json().context("failed to serialize summary")?;
            writeln!(stdout.lock(), "{json}").context("failed to write summary")?;
        }
    }

    Ok(if stats.had_errors() {
        ExitCode::PartialSuccess
    } else if stats.duplicates_found == 0 {
        ExitCode::NothingToLink
    } else {
        ExitCode::Success
    })
}
