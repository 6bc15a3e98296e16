//! End-to-end scenarios: walker plus pipeline over real temp trees.

use std::fs;
use std::path::{Path, PathBuf};

use dupelink::cli::Cli;
use dupelink::error::ExitCode;
use dupelink::pipeline::{DedupOptions, Deduplicator};
use dupelink::scanner::{Walker, WalkerConfig};
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    let (ma, mb) = (fs::metadata(a).unwrap(), fs::metadata(b).unwrap());
    (ma.dev(), ma.ino()) == (mb.dev(), mb.ino())
}

/// Walk a tree through a fresh pipeline and return the deduplicator.
fn run_over(root: &Path, walker_config: WalkerConfig, options: DedupOptions) -> Deduplicator {
    let walker = Walker::new(root, walker_config);
    let mut dedup = Deduplicator::new(options);
    for entry in walker.walk() {
        match entry {
            Ok(file) => {
                dedup.process_file(&file.path).unwrap();
            }
            Err(e) => dedup.record_walk_error(&e),
        }
    }
    dedup
}

#[test]
fn three_identical_files_are_linked_to_the_first() {
    let dir = TempDir::new().unwrap();
    let content = [0xABu8; 100];
    let a = write_file(dir.path(), "a.bin", &content);
    let b = write_file(dir.path(), "b.bin", &content);
    let c = write_file(dir.path(), "c.bin", &content);

    let dedup = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions::default(),
    );
    let stats = *dedup.stats();

    assert_eq!(stats.files_scanned, 3);
    assert_eq!(stats.files_linked, 2);
    assert_eq!(stats.bytes_saved, 200);
    assert_eq!(stats.duplicates_found, 2);
    assert!(!stats.had_errors());

    // All three paths still resolve to the same content.
    assert_eq!(fs::read(&a).unwrap(), content);
    assert_eq!(fs::read(&b).unwrap(), content);
    assert_eq!(fs::read(&c).unwrap(), content);
    #[cfg(unix)]
    {
        assert!(same_inode(&a, &b));
        assert!(same_inode(&a, &c));
    }

    // No backup files linger after completed replacements.
    assert!(!dir.path().join("b.bin.bak").exists());
    assert!(!dir.path().join("c.bin.bak").exists());
}

#[test]
fn files_differing_in_one_byte_stay_separate() {
    let dir = TempDir::new().unwrap();
    let mut other = [0x11u8; 256];
    other[100] ^= 0x40;
    let a = write_file(dir.path(), "a.bin", &[0x11u8; 256]);
    let b = write_file(dir.path(), "b.bin", &other);

    let dedup = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions::default(),
    );
    let stats = *dedup.stats();

    assert_eq!(stats.files_scanned, 2);
    assert_eq!(stats.files_linked, 0);
    assert_eq!(stats.duplicates_found, 0);
    assert_eq!(dedup.indexed_files(), 2);
    #[cfg(unix)]
    assert!(!same_inode(&a, &b));
    let _ = (a, b);
}

#[test]
fn duplicates_across_subdirectories_are_found() {
    let dir = TempDir::new().unwrap();
    let content = b"shared across the tree";
    let a = write_file(dir.path(), "top.txt", content);
    let b = write_file(dir.path(), "deep/nested/copy.txt", content);
    write_file(dir.path(), "deep/other.txt", b"unrelated");

    let dedup = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions::default(),
    );
    let stats = *dedup.stats();

    assert_eq!(stats.files_scanned, 3);
    assert_eq!(stats.files_linked, 1);
    assert_eq!(stats.bytes_saved, content.len() as u64);
    #[cfg(unix)]
    assert!(same_inode(&a, &b));
    let _ = (a, b);
}

#[test]
fn dot_directories_are_invisible_to_the_scan() {
    let dir = TempDir::new().unwrap();
    let content = b"would be a duplicate";
    write_file(dir.path(), "visible.txt", content);
    let hidden = write_file(dir.path(), ".git/objects/blob.txt", content);

    let dedup = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions::default(),
    );
    let stats = *dedup.stats();

    assert_eq!(stats.files_scanned, 1);
    assert_eq!(stats.files_linked, 0);
    // The hidden copy was never touched.
    assert_eq!(fs::read(&hidden).unwrap(), content);
}

#[test]
fn dry_run_finds_duplicates_but_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let content = [9u8; 50];
    let a = write_file(dir.path(), "a.bin", &content);
    let b = write_file(dir.path(), "b.bin", &content);

    let dedup = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions {
            dry_run: true,
            ..Default::default()
        },
    );
    let stats = *dedup.stats();

    assert_eq!(stats.duplicates_found, 1);
    assert_eq!(stats.files_linked, 0);
    assert_eq!(stats.bytes_saved, 0);
    #[cfg(unix)]
    assert!(!same_inode(&a, &b));
    let _ = (a, b);
}

#[test]
fn min_size_filter_keeps_small_files_out_of_the_pipeline() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "small_a.bin", b"tiny");
    write_file(dir.path(), "small_b.bin", b"tiny");
    write_file(dir.path(), "big_a.bin", &[3u8; 512]);
    write_file(dir.path(), "big_b.bin", &[3u8; 512]);

    let dedup = run_over(
        dir.path(),
        WalkerConfig {
            min_size: Some(100),
            ..Default::default()
        },
        DedupOptions::default(),
    );
    let stats = *dedup.stats();

    assert_eq!(stats.files_scanned, 2);
    assert_eq!(stats.files_linked, 1);
    assert_eq!(stats.bytes_saved, 512);
}

#[test]
#[cfg(unix)]
fn second_run_over_a_linked_tree_does_nothing() {
    let dir = TempDir::new().unwrap();
    let content = [0xC3u8; 64];
    write_file(dir.path(), "a.bin", &content);
    write_file(dir.path(), "b.bin", &content);

    let first = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions::default(),
    );
    assert_eq!(first.stats().files_linked, 1);

    // Everything shares an inode now; the walker skips the known links,
    // so the pipeline sees one file and finds nothing to do.
    let second = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions::default(),
    );
    let stats = *second.stats();
    assert_eq!(stats.files_scanned, 1);
    assert_eq!(stats.files_linked, 0);
    assert_eq!(stats.duplicates_found, 0);
}

#[test]
fn paranoid_run_links_true_duplicates() {
    let dir = TempDir::new().unwrap();
    let content = [0x42u8; 300];
    let a = write_file(dir.path(), "a.bin", &content);
    let b = write_file(dir.path(), "b.bin", &content);

    let dedup = run_over(
        dir.path(),
        WalkerConfig::default(),
        DedupOptions {
            paranoid: true,
            ..Default::default()
        },
    );
    assert_eq!(dedup.stats().files_linked, 1);
    #[cfg(unix)]
    assert!(same_inode(&a, &b));
    let _ = (a, b);
}

#[test]
fn run_app_end_to_end_reports_success() {
    use clap::Parser;

    let dir = TempDir::new().unwrap();
    let content = b"application level duplicate";
    let a = write_file(dir.path(), "a.txt", content);
    let b = write_file(dir.path(), "b.txt", content);

    let cli = Cli::parse_from([
        "dupelink",
        "--quiet",
        "--no-color",
        dir.path().to_str().unwrap(),
    ]);
    let code = dupelink::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    #[cfg(unix)]
    assert!(same_inode(&a, &b));
    let _ = (a, b);
}

#[test]
fn run_app_with_no_duplicates_exits_nothing_to_link() {
    use clap::Parser;

    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"one");
    write_file(dir.path(), "b.txt", b"two");

    let cli = Cli::parse_from([
        "dupelink",
        "--quiet",
        "--no-color",
        dir.path().to_str().unwrap(),
    ]);
    let code = dupelink::run_app(cli).unwrap();
    assert_eq!(code, ExitCode::NothingToLink);
}

#[test]
fn run_app_rejects_a_missing_root() {
    use clap::Parser;

    let cli = Cli::parse_from(["dupelink", "--quiet", "/no/such/tree/anywhere"]);
    assert!(dupelink::run_app(cli).is_err());
}
