//! Polling tail watcher.
//!
//! Recovers the last lines of a file on construction, then polls it on a
//! dedicated thread and emits every newly appended complete line.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backfill::read_last_lines;
use super::error::WatcherError;
use super::line::{split_complete, Line};
use crate::config::TailConfig;
use crate::history::RingHistory;

/// Callback invoked on the polling thread for every new line.
pub type LineCallback = Arc<dyn Fn(&Line) + Send + Sync>;

/// Lifecycle of a [`TailWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherState {
    /// Constructed, not yet polling.
    Idle,
    /// Polling thread is running.
    Running,
    /// Stopped for good.
    Stopped,
}

enum Lifecycle {
    Idle,
    Running { stop_tx: std_mpsc::Sender<()> },
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> WatcherState {
        match self {
            Self::Idle => WatcherState::Idle,
            Self::Running { .. } => WatcherState::Running,
            Self::Stopped => WatcherState::Stopped,
        }
    }
}

/// State shared between the watcher and its polling thread.
struct Shared {
    path: PathBuf,
    history: Arc<RingHistory<Line>>,
    /// End of the last complete line consumed.
    offset: AtomicU64,
    /// Serializes scans; holds the next sequence number.
    next_seq: Mutex<u64>,
    /// Thread currently inside a scan, if any.
    scanner: Mutex<Option<ThreadId>>,
    /// Set once by `stop`; scans emit nothing afterwards.
    stopped: AtomicBool,
    callback: Mutex<Option<LineCallback>>,
}

/// Marks the current thread as the scanner until dropped.
struct ScanMark<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> ScanMark<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Self(slot)
    }
}

impl Drop for ScanMark<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Seed history from the end of the file. An unreadable file leaves
    /// everything at zero.
    fn backfill(&self, chunk_size: usize) {
        let result = File::open(&self.path).and_then(|mut file| {
            let size = file.metadata()?.len();
            read_last_lines(&mut file, size, self.history.capacity(), chunk_size)
        });

        match result {
            Ok(backfill) => {
                let mut next_seq = lock(&self.next_seq);
                for text in backfill.lines {
                    self.history.append(Line::new(*next_seq, text));
                    *next_seq += 1;
                }
                self.offset.store(backfill.end, Ordering::Release);
                tracing::debug!(
                    path = %self.path.display(),
                    lines = *next_seq,
                    offset = backfill.end,
                    "Recovered history"
                );
            }
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "File not readable yet, starting with empty history"
                );
            }
        }
    }

    /// True when called from inside a scan, i.e. from the line callback.
    fn in_scan(&self) -> bool {
        *lock(&self.scanner) == Some(thread::current().id())
    }

    /// One poll tick. Transient I/O failures are logged and swallowed.
    fn scan(&self) -> usize {
        match self.try_scan() {
            Ok(emitted) => emitted,
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "File unreadable, retrying next tick"
                );
                0
            }
        }
    }

    fn try_scan(&self) -> Result<usize, WatcherError> {
        let mut next_seq = lock(&self.next_seq);
        if self.stopped.load(Ordering::Acquire) {
            return Ok(0);
        }
        let _mark = ScanMark::enter(&self.scanner);
        let mut offset = self.offset.load(Ordering::Acquire);

        let mut file = File::open(&self.path)?;
        let size = file.metadata()?.len();

        if size < offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = offset,
                new_len = size,
                "File truncated, resetting offset to 0"
            );
            offset = 0;
            self.offset.store(0, Ordering::Release);
        }

        if size == offset {
            return Ok(0);
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        file.take(size - offset).read_to_end(&mut buf)?;

        let (texts, consumed) = split_complete(&buf);
        if texts.is_empty() {
            return Ok(0);
        }

        let callback = lock(&self.callback).clone();
        let emitted = texts.len();

        for text in texts {
            let line = Line::new(*next_seq, text);
            *next_seq += 1;
            self.history.append(line.clone());
            if let Some(callback) = &callback {
                callback(&line);
            }
        }

        self.offset.store(offset + consumed as u64, Ordering::Release);
        Ok(emitted)
    }
}

fn poll_loop(shared: &Shared, stop_rx: &std_mpsc::Receiver<()>, interval: Duration) {
    loop {
        let emitted = shared.scan();
        if emitted > 0 {
            tracing::trace!(lines = emitted, "Emitted new lines");
        }

        match stop_rx.recv_timeout(interval) {
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Tails one growing file.
///
/// Construction recovers the last `history_capacity` lines synchronously.
/// [`start`](Self::start) spawns a polling thread that reads appended bytes
/// every poll interval, records complete lines in the history and hands each
/// one to the line callback. A trailing fragment without a terminator is held
/// back until it is terminated.
pub struct TailWatcher {
    shared: Arc<Shared>,
    poll_interval: Duration,
    lifecycle: Mutex<Lifecycle>,
    /// Taken by whichever `stop` caller joins the polling thread.
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl TailWatcher {
    /// Create a watcher with the default configuration.
    ///
    /// A missing or unreadable file is not an error: history starts empty and
    /// polling keeps retrying until the file can be read.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let config = TailConfig::default();
        let capacity = NonZeroUsize::new(config.history_capacity).unwrap_or(NonZeroUsize::MIN);
        Self::build(path.into(), RingHistory::with_capacity(capacity), &config)
    }

    /// Create a watcher with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the history capacity, poll interval or chunk size
    /// is zero.
    pub fn with_config(
        path: impl Into<PathBuf>,
        config: &TailConfig,
    ) -> Result<Self, WatcherError> {
        if config.poll_interval_ms == 0 {
            return Err(WatcherError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if config.chunk_size == 0 {
            return Err(WatcherError::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        let history = RingHistory::new(config.history_capacity)?;
        Ok(Self::build(path.into(), history, config))
    }

    fn build(path: PathBuf, history: RingHistory<Line>, config: &TailConfig) -> Self {
        let shared = Arc::new(Shared {
            path,
            history: Arc::new(history),
            offset: AtomicU64::new(0),
            next_seq: Mutex::new(0),
            scanner: Mutex::new(None),
            stopped: AtomicBool::new(false),
            callback: Mutex::new(None),
        });
        shared.backfill(config.chunk_size);

        Self {
            shared,
            poll_interval: config.poll_interval(),
            lifecycle: Mutex::new(Lifecycle::Idle),
            poller: Mutex::new(None),
        }
    }

    /// Register the callback invoked once per new line, in file order.
    ///
    /// Replaces any previously registered callback. The callback runs while
    /// scans are serialized: calling [`scan`](Self::scan) from it is a no-op,
    /// and calling [`stop`](Self::stop) from it signals the loop without
    /// waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error unless the watcher is still idle.
    pub fn set_line_callback<F>(&self, callback: F) -> Result<(), WatcherError>
    where
        F: Fn(&Line) + Send + Sync + 'static,
    {
        let lifecycle = lock(&self.lifecycle);
        match *lifecycle {
            Lifecycle::Idle => {
                *lock(&self.shared.callback) = Some(Arc::new(callback));
                Ok(())
            }
            Lifecycle::Running { .. } => Err(WatcherError::AlreadyRunning),
            Lifecycle::Stopped => Err(WatcherError::Stopped),
        }
    }

    /// Start the background polling thread.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::AlreadyRunning`] if already started,
    /// [`WatcherError::Stopped`] after [`stop`](Self::stop), or
    /// [`WatcherError::Spawn`] if the thread cannot be created.
    pub fn start(&self) -> Result<(), WatcherError> {
        let mut lifecycle = lock(&self.lifecycle);
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running { .. } => return Err(WatcherError::AlreadyRunning),
            Lifecycle::Stopped => return Err(WatcherError::Stopped),
        }

        let (stop_tx, stop_rx) = std_mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let interval = self.poll_interval;

        let handle = thread::Builder::new()
            .name("tail-watcher".to_string())
            .spawn(move || poll_loop(&shared, &stop_rx, interval))
            .map_err(WatcherError::Spawn)?;

        tracing::info!(
            path = %self.shared.path.display(),
            interval = ?interval,
            "Tail watcher started"
        );
        *lock(&self.poller) = Some(handle);
        *lifecycle = Lifecycle::Running { stop_tx };
        Ok(())
    }

    /// Stop polling and wait for the polling thread and any in-flight scan
    /// to finish. No callback fires once this returns.
    ///
    /// Idempotent, and every concurrent caller waits. When called from inside
    /// the line callback the loop is signalled and exits after the current
    /// tick instead of being joined.
    pub fn stop(&self) {
        let stop_tx = {
            let mut lifecycle = lock(&self.lifecycle);
            self.shared.stopped.store(true, Ordering::Release);
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running { stop_tx } => Some(stop_tx),
                Lifecycle::Idle | Lifecycle::Stopped => None,
            }
        };
        if let Some(stop_tx) = stop_tx {
            let _ = stop_tx.send(());
        }

        if self.shared.in_scan() {
            return;
        }

        // Held across the join so late callers wait for it too.
        let mut poller = lock(&self.poller);
        if let Some(handle) = poller.take() {
            if handle.join().is_err() {
                tracing::error!(path = %self.shared.path.display(), "Polling thread panicked");
            }
            tracing::info!(path = %self.shared.path.display(), "Tail watcher stopped");
        }
        drop(poller);

        // Wait out a manual scan still running on another thread.
        drop(lock(&self.shared.next_seq));
    }

    /// Run one poll tick on the calling thread.
    ///
    /// Returns the number of lines emitted. Serialized with the polling
    /// thread, so it is safe to call while running. Returns 0 once the
    /// watcher is stopped, and when called from inside the line callback.
    pub fn scan(&self) -> usize {
        if self.shared.in_scan() {
            return 0;
        }
        self.shared.scan()
    }

    /// Current history window as plain text, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.shared
            .history
            .snapshot()
            .into_iter()
            .map(|line| line.text)
            .collect()
    }

    /// Current history window with sequence numbers, oldest first.
    #[must_use]
    pub fn history_lines(&self) -> Vec<Line> {
        self.shared.history.snapshot()
    }

    /// Shared handle to the history buffer.
    #[must_use]
    pub fn history_handle(&self) -> Arc<RingHistory<Line>> {
        Arc::clone(&self.shared.history)
    }

    /// Byte offset just past the last consumed line.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.shared.offset.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> WatcherState {
        lock(&self.lifecycle).state()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }
}

impl fmt::Debug for TailWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailWatcher")
            .field("path", &self.shared.path)
            .field("offset", &self.offset())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for TailWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
