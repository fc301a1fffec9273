//! Integration tests for the tail watcher.

use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tailcast::config::TailConfig;
use tailcast::watcher::{Line, TailWatcher, WatcherState};
use tempfile::{NamedTempFile, TempDir};

fn append(path: &Path, content: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("Failed to open file for append");
    file.write_all(content.as_bytes())
        .expect("Failed to append");
    file.flush().expect("Failed to flush");
}

/// Start a watcher whose callback forwards lines to a std channel.
fn started(path: &Path, config: &TailConfig) -> (TailWatcher, mpsc::Receiver<Line>) {
    let watcher = TailWatcher::with_config(path, config).expect("Failed to build watcher");
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    watcher
        .set_line_callback(move |line| {
            let _ = tx.lock().unwrap().send(line.clone());
        })
        .expect("Failed to set callback");
    watcher.start().expect("Failed to start watcher");
    (watcher, rx)
}

/// A watcher built from a 12-line file keeps the last ten.
#[test]
fn test_backfill_keeps_last_ten_lines() {
    let mut file = NamedTempFile::new().unwrap();
    for i in 1..=12 {
        writeln!(file, "L{i}").unwrap();
    }
    file.flush().unwrap();

    let watcher = TailWatcher::new(file.path());

    let expected: Vec<String> = (3..=12).map(|i| format!("L{i}")).collect();
    assert_eq!(watcher.history(), expected);
}

/// With fewer lines than the window, history holds all of them.
#[test]
fn test_backfill_short_file() {
    let mut file = NamedTempFile::new().unwrap();
    for i in 1..=7 {
        writeln!(file, "line {i}").unwrap();
    }
    file.flush().unwrap();

    let watcher = TailWatcher::new(file.path());
    assert_eq!(watcher.history().len(), 7);
    assert_eq!(watcher.history()[0], "line 1");
    assert_eq!(watcher.history()[6], "line 7");
}

/// A large file only costs a tail read and still yields the right window.
#[test]
fn test_backfill_large_file() {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..50_000 {
        writeln!(file, "entry number {i:06} with some padding text").unwrap();
    }
    file.flush().unwrap();

    let watcher = TailWatcher::new(file.path());
    let history = watcher.history();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0], "entry number 049990 with some padding text");
    assert_eq!(history[9], "entry number 049999 with some padding text");
}

/// One appended line produces exactly one callback within a poll interval.
#[test]
fn test_incremental_detection() {
    let file = NamedTempFile::new().unwrap();
    let (watcher, rx) = started(file.path(), &TailConfig::default());

    let appended_at = Instant::now();
    append(file.path(), "fresh line\n");

    let line = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("Line should be detected");
    assert_eq!(line.text, "fresh line");
    assert!(appended_at.elapsed() < Duration::from_secs(1));

    // Nothing else arrives.
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert_eq!(watcher.history(), vec!["fresh line"]);

    watcher.stop();
}

/// Bytes without a terminator are held back until the newline arrives.
#[test]
fn test_partial_line_withheld_until_terminated() {
    let file = NamedTempFile::new().unwrap();
    let config = TailConfig {
        poll_interval_ms: 20,
        ..Default::default()
    };
    let (watcher, rx) = started(file.path(), &config);

    append(file.path(), "part one, ");
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    append(file.path(), "part two");
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(watcher.history().is_empty());

    append(file.path(), "\n");
    let line = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("Completed line should be delivered");
    assert_eq!(line.text, "part one, part two");
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    watcher.stop();
}

/// New lines continue the sequence after the backfilled ones.
#[test]
fn test_sequence_continues_after_backfill() {
    let mut file = NamedTempFile::new().unwrap();
    for i in 1..=12 {
        writeln!(file, "L{i}").unwrap();
    }
    file.flush().unwrap();

    let config = TailConfig {
        poll_interval_ms: 20,
        ..Default::default()
    };
    let (watcher, rx) = started(file.path(), &config);
    assert_eq!(watcher.history_lines().last().unwrap().seq, 9);

    append(file.path(), "L13\nL14\n");
    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(first, Line::new(10, "L13"));
    assert_eq!(second, Line::new(11, "L14"));

    let expected: Vec<String> = (5..=14).map(|i| format!("L{i}")).collect();
    assert_eq!(watcher.history(), expected);

    watcher.stop();
}

/// A file created after the watcher started is picked up.
#[test]
fn test_missing_file_is_picked_up_later() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("later.log");
    let config = TailConfig {
        poll_interval_ms: 20,
        ..Default::default()
    };
    let (watcher, rx) = started(&path, &config);
    assert!(watcher.history().is_empty());

    std::thread::sleep(Duration::from_millis(60));
    append(&path, "created\n");

    let line = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(line.text, "created");

    watcher.stop();
}

/// Stop blocks until the loop exits; later appends are never reported.
#[test]
fn test_stop_halts_delivery() {
    let file = NamedTempFile::new().unwrap();
    let config = TailConfig {
        poll_interval_ms: 20,
        ..Default::default()
    };
    let (watcher, rx) = started(file.path(), &config);

    append(file.path(), "seen\n");
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap().text, "seen");

    watcher.stop();
    assert_eq!(watcher.state(), WatcherState::Stopped);

    append(file.path(), "unseen\n");
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

/// Dropping a running watcher stops its thread.
#[test]
fn test_drop_stops_watcher() {
    let file = NamedTempFile::new().unwrap();
    let config = TailConfig {
        poll_interval_ms: 20,
        ..Default::default()
    };
    let (watcher, rx) = started(file.path(), &config);
    drop(watcher);

    append(file.path(), "after drop\n");
    // The callback (and its sender) is gone with the watcher.
    assert!(matches!(
        rx.recv_timeout(Duration::from_millis(200)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    ));
}
