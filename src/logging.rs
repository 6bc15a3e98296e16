//! Logging setup on the `log` facade with an `env_logger` backend.
//!
//! Per-file and per-replace diagnostics go through this sink; the walk
//! never aborts because of them. Levels come from (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `-v`/`-vv` (debug/trace)
//! 3. Default: info

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize logging from the CLI verbosity flags.
///
/// Call once at startup. Repeated initialization (as happens across unit
/// tests sharing a process) is silently ignored.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    // Debug builds carry timestamps and module paths; release builds keep
    // the output compact.
    #[cfg(debug_assertions)]
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(
            buf,
            "{} {style}{:<5}{style:#} [{}] {}",
            buf.timestamp_seconds(),
            level,
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });
    #[cfg(not(debug_assertions))]
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
    });

    if builder.try_init().is_err() {
        log::debug!("Logging already initialized, keeping existing configuration");
    }
}

/// Map CLI flags to a level filter.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_level_default() {
        assert_eq!(determine_level(0, false), LevelFilter::Info);
    }

    #[test]
    fn test_determine_level_verbose() {
        assert_eq!(determine_level(1, false), LevelFilter::Debug);
        assert_eq!(determine_level(2, false), LevelFilter::Trace);
        assert_eq!(determine_level(7, false), LevelFilter::Trace);
    }

    #[test]
    fn test_determine_level_quiet_wins() {
        assert_eq!(determine_level(0, true), LevelFilter::Error);
        assert_eq!(determine_level(2, true), LevelFilter::Error);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_logging(0, false);
        init_logging(1, false);
    }
}
