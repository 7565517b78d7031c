#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::error::Error;
use crate::screen::Screen;
use tempfile::TempDir;

fn sample_screen() -> Screen {
    let mut screen = Screen::new(40, 4);
    screen.feed(b"Usage: journal <command> [options]\r\n");
    screen.feed(b"  new     Create an entry   ");
    screen
}

#[test]
fn capture_trims_trailing_blanks_per_row() {
    let record = SnapshotRecord::capture(&sample_screen(), false);
    let lines: Vec<&str> = record.text().lines().collect();
    assert_eq!(lines[0], "Usage: journal <command> [options]");
    assert_eq!(lines[1], "  new     Create an entry");
    // One line per grid row: 4 rows means 3 separators.
    assert_eq!(record.text().matches('\n').count(), 3);
}

#[test]
fn capture_ignores_styling_by_default() {
    let mut plain = Screen::new(20, 2);
    plain.feed(b"warning");
    let mut styled = Screen::new(20, 2);
    styled.feed(b"\x1b[1;31mwarning\x1b[0m");
    assert_eq!(
        SnapshotRecord::capture(&plain, false),
        SnapshotRecord::capture(&styled, false)
    );
}

#[test]
fn style_aware_capture_marks_attribute_runs() {
    let mut screen = Screen::new(20, 2);
    screen.feed(b"a\x1b[1mb\x1b[0mc");
    let record = SnapshotRecord::capture(&screen, true);
    assert_eq!(record.text().lines().next().unwrap(), "a{+b}b{-b}c");
}

#[test]
fn compare_round_trip_is_match() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path(), BaselineMode::Update);
    let record = SnapshotRecord::capture(&sample_screen(), false);

    assert!(store.compare(&record, "round-trip").unwrap().is_match());
    // Second compare against the baseline just written: still a match.
    let verify = SnapshotStore::new(dir.path(), BaselineMode::Verify);
    assert!(verify.compare(&record, "round-trip").unwrap().is_match());
}

#[test]
fn missing_baseline_fails_in_verify_mode() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path(), BaselineMode::Verify);
    let record = SnapshotRecord::capture(&sample_screen(), false);

    let err = store.compare(&record, "never-recorded").unwrap_err();
    assert!(matches!(err, Error::MissingBaseline { key } if key == "never-recorded"));
    assert!(!store.baseline_path("never-recorded").exists());
}

#[test]
fn missing_baseline_created_in_update_mode() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path(), BaselineMode::Update);
    let record = SnapshotRecord::capture(&sample_screen(), false);

    assert!(store.compare(&record, "fresh").unwrap().is_match());
    let path = store.baseline_path("fresh");
    assert!(path.exists());
    let written = std::fs::read_to_string(path).unwrap();
    assert!(written.contains("Usage: journal"));
}

#[test]
fn mismatch_yields_full_diff() {
    let dir = TempDir::new().unwrap();
    let update = SnapshotStore::new(dir.path(), BaselineMode::Update);
    let baseline = SnapshotRecord::capture(&sample_screen(), false);
    update.compare(&baseline, "diffcase").unwrap();

    let mut changed = Screen::new(40, 4);
    changed.feed(b"Usage: journal <cmd> [options]");
    let captured = SnapshotRecord::capture(&changed, false);

    let store = SnapshotStore::new(dir.path(), BaselineMode::Verify);
    match store.compare(&captured, "diffcase").unwrap() {
        Comparison::Diff {
            baseline,
            captured,
            diff,
        } => {
            assert!(baseline.contains("<command>"));
            assert!(captured.contains("<cmd>"));
            assert!(diff.contains("-Usage: journal <command> [options]"));
            assert!(diff.contains("+Usage: journal <cmd> [options]"));
        }
        Comparison::Match => panic!("expected a diff"),
    }
}

#[test]
fn update_mode_overwrites_stale_baseline() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path(), BaselineMode::Update);
    let old = SnapshotRecord::capture(&sample_screen(), false);
    store.compare(&old, "stale").unwrap();

    let mut screen = Screen::new(40, 4);
    screen.feed(b"brand new content");
    let new = SnapshotRecord::capture(&screen, false);
    assert!(store.compare(&new, "stale").unwrap().is_match());

    let written = std::fs::read_to_string(store.baseline_path("stale")).unwrap();
    assert!(written.contains("brand new content"));
}

#[test]
fn canonicalize_tolerates_crlf_baselines() {
    let dir = TempDir::new().unwrap();
    let record = SnapshotRecord::capture(&sample_screen(), false);
    let path = dir.path().join("crlf.snap");
    std::fs::write(&path, record.text().replace('\n', "\r\n")).unwrap();

    let store = SnapshotStore::new(dir.path(), BaselineMode::Verify);
    assert!(store.compare(&record, "crlf").unwrap().is_match());
}
