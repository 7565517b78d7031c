#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use tempfile::TempDir;

#[test]
fn creates_trace_files() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();
    rec.flush().unwrap();
    assert!(dir.path().join("events.jsonl").exists());
    assert!(dir.path().join("raw.bin").exists());
}

#[test]
fn events_are_one_json_object_per_line() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();
    rec.log_send("ls -la\n").unwrap();
    rec.log_match("total").unwrap();
    rec.log_timeout("missing").unwrap();
    rec.log_exit(0).unwrap();
    rec.flush().unwrap();

    let log = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 4);
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value.get("ms").is_some(), "every event carries an offset");
    }
    assert!(lines[0].contains(r#""send""#));
    assert!(lines[1].contains(r#""match":"total""#));
    assert!(lines[2].contains(r#""timeout":"missing""#));
    assert!(lines[3].contains(r#""exit":0"#));
}

#[test]
fn raw_dump_preserves_bytes_exactly() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();
    let chunk = b"plain \x1b[1mbold\x1b[0m \xf0\x9f\x91\x8d";
    rec.append_raw(chunk).unwrap();
    rec.flush().unwrap();

    let raw = std::fs::read(dir.path().join("raw.bin")).unwrap();
    assert_eq!(raw, chunk);
}

#[test]
fn send_with_control_bytes_still_valid_json() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();
    rec.log_send("quote \" backslash \\ newline \n").unwrap();
    rec.flush().unwrap();

    let log = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
    let value: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert_eq!(
        value["send"].as_str().unwrap(),
        "quote \" backslash \\ newline \n"
    );
}
