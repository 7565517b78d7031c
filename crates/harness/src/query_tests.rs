#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::error::Error;
use std::time::Duration;

fn shared(cols: usize, rows: usize) -> SharedScreen {
    Arc::new(Mutex::new(Screen::new(cols, rows)))
}

fn short() -> FindOptions {
    FindOptions {
        timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(5),
        case_sensitive: true,
    }
}

#[tokio::test]
async fn finds_text_already_on_screen() {
    let screen = shared(40, 4);
    screen.lock().feed(b"Usage: journal [--help]");
    let m = find_text(&screen, "--help", &short()).await.unwrap();
    assert_eq!(m.row, 0);
    assert_eq!(m.col, 16);
}

#[tokio::test]
async fn finds_text_that_appears_mid_poll() {
    let screen = shared(40, 4);
    let writer = Arc::clone(&screen);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer.lock().feed(b"ready now");
    });
    let m = find_text(&screen, "ready", &short()).await.unwrap();
    assert_eq!(m.pattern, "ready");
    handle.await.unwrap();
}

#[tokio::test]
async fn times_out_on_absent_text() {
    let screen = shared(40, 4);
    screen.lock().feed(b"something else");
    let err = find_text(&screen, "nonexistent-string-xyz", &short())
        .await
        .unwrap_err();
    match err {
        Error::TextNotFound { pattern, .. } => {
            assert_eq!(pattern, "nonexistent-string-xyz");
        }
        other => panic!("expected TextNotFound, got {other}"),
    }
}

#[tokio::test]
async fn case_insensitive_option() {
    let screen = shared(40, 4);
    screen.lock().feed(b"Pomoc programu");
    assert!(find_text(&screen, "POMOC", &short()).await.is_err());
    let opts = short().case_insensitive();
    assert!(find_text(&screen, "POMOC", &opts).await.is_ok());
}

#[tokio::test]
async fn find_any_reports_the_winning_pattern() {
    let screen = shared(40, 4);
    screen.lock().feed(b"Hilfe zum Programm");
    let m = find_any(&screen, &["help", "Hilfe", "pomoc"], &short())
        .await
        .unwrap();
    assert_eq!(m.pattern, "Hilfe");
}

#[tokio::test]
async fn find_any_shares_a_single_timeout() {
    let screen = shared(40, 4);
    let start = tokio::time::Instant::now();
    let err = find_any(&screen, &["a-miss", "b-miss", "c-miss"], &short())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TextNotFound { .. }));
    // Bounded by the one 300 ms budget, not 3 × 300 ms.
    assert!(start.elapsed() < Duration::from_millis(900));
}

#[tokio::test]
async fn find_regex_locates_match() {
    let screen = shared(40, 4);
    screen.lock().feed(b"line one\r\n  exit code: 42");
    let re = regex::Regex::new(r"exit code: \d+").unwrap();
    let m = find_regex(&screen, &re, &short()).await.unwrap();
    assert_eq!(m.row, 1);
    assert_eq!(m.col, 2);
}

#[tokio::test]
async fn never_matches_text_absent_from_all_polls() {
    let screen = shared(40, 4);
    let writer = Arc::clone(&screen);
    tokio::spawn(async move {
        for i in 0..10 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.lock().feed(format!("tick {i}\r\n").as_bytes());
        }
    });
    assert!(find_text(&screen, "tock", &short()).await.is_err());
}
