//! Run summaries: human-readable text and JSON.

use std::io::{self, Write};

use bytesize::ByteSize;
use serde::Serialize;
use yansi::Paint;

use crate::pipeline::ScanStats;

/// Final report for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Whether the run mutated anything.
    pub dry_run: bool,
    #[serde(flatten)]
    pub stats: ScanStats,
}

impl RunSummary {
    #[must_use]
    pub fn new(stats: ScanStats, dry_run: bool) -> Self {
        Self { dry_run, stats }
    }

    /// Write the human-readable summary.
    ///
    /// # Errors
    ///
    /// Propagates write failures on the output stream.
    pub fn write_text(&self, out: &mut impl Write) -> io::Result<()> {
        let s = &self.stats;
        writeln!(out, "{:>12} files scanned in total", s.files_scanned.bold())?;
        if self.dry_run {
            writeln!(
                out,
                "{:>12} duplicate files found (dry run, nothing changed)",
                s.duplicates_found.bold()
            )?;
        } else {
            writeln!(out, "{:>12} files hard linked", s.files_linked.bold())?;
            writeln!(
                out,
                "{:>12} bytes saved ({})",
                s.bytes_saved.green().bold(),
                ByteSize::b(s.bytes_saved).green()
            )?;
        }
        if s.files_skipped > 0 {
            writeln!(out, "{:>12} files skipped", s.files_skipped.yellow())?;
        }
        if s.replace_errors > 0 {
            writeln!(
                out,
                "{:>12} replacements failed (see log)",
                s.replace_errors.red()
            )?;
        }
        if s.walk_errors > 0 {
            writeln!(out, "{:>12} traversal errors", s.walk_errors.yellow())?;
        }
        Ok(())
    }

    /// Serialize the summary as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> ScanStats {
        ScanStats {
            files_scanned: 10,
            files_linked: 3,
            bytes_saved: 3000,
            duplicates_found: 3,
            files_skipped: 1,
            replace_errors: 0,
            walk_errors: 0,
        }
    }

    #[test]
    fn test_text_summary_contains_counters() {
        yansi::disable();
        let summary = RunSummary::new(sample_stats(), false);
        let mut out = Vec::new();
        summary.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("10 files scanned in total"));
        assert!(text.contains("3 files hard linked"));
        assert!(text.contains("3000 bytes saved"));
        assert!(text.contains("1 files skipped"));
        assert!(!text.contains("replacements failed"));
    }

    #[test]
    fn test_dry_run_summary_reports_found_not_linked() {
        yansi::disable();
        let summary = RunSummary::new(sample_stats(), true);
        let mut out = Vec::new();
        summary.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("duplicate files found"));
        assert!(!text.contains("files hard linked"));
    }

    #[test]
    fn test_json_summary_flattens_stats() {
        let summary = RunSummary::new(sample_stats(), false);
        let json = summary.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["files_scanned"], 10);
        assert_eq!(value["files_linked"], 3);
        assert_eq!(value["bytes_saved"], 3000);
        assert_eq!(value["dry_run"], false);
    }
}
