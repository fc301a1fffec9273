//! Wires a tail watcher to a broadcaster.
//!
//! The watcher's line callback pushes onto an unbounded channel and a tokio
//! task forwards each line to the broadcaster, so fan-out never runs on the
//! polling thread.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;
use crate::config::TailConfig;
use crate::watcher::{Line, TailWatcher, WatcherError, WatcherState};

/// A running watcher plus the broadcaster fed by it.
#[derive(Debug)]
pub struct TailHub {
    watcher: Arc<TailWatcher>,
    broadcaster: Broadcaster,
    cancel: CancellationToken,
    forwarder: Option<JoinHandle<()>>,
}

impl TailHub {
    /// Build the watcher, start polling and start forwarding lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the polling
    /// thread cannot be spawned.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(path: impl Into<PathBuf>, config: &TailConfig) -> Result<Self, WatcherError> {
        let watcher = Arc::new(TailWatcher::with_config(path, config)?);
        let broadcaster = Broadcaster::new(watcher.history_handle());

        let (line_tx, line_rx) = mpsc::unbounded_channel::<Line>();
        watcher.set_line_callback(move |line| {
            // Receiver only goes away during shutdown.
            let _ = line_tx.send(line.clone());
        })?;

        let cancel = CancellationToken::new();
        let forwarder = tokio::spawn({
            let broadcaster = broadcaster.clone();
            let cancel = cancel.clone();
            async move { broadcaster.forward(line_rx, cancel).await }
        });

        if let Err(e) = watcher.start() {
            cancel.cancel();
            return Err(e);
        }

        tracing::info!(
            path = %watcher.path().display(),
            history = watcher.history_lines().len(),
            "Tailing file"
        );

        Ok(Self {
            watcher,
            broadcaster,
            cancel,
            forwarder: Some(forwarder),
        })
    }

    #[must_use]
    pub fn watcher(&self) -> &Arc<TailWatcher> {
        &self.watcher
    }

    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Stop polling, then stop the forwarder.
    ///
    /// This is the supported way to tear a hub down. Dropping it instead
    /// stops the watcher in the background without waiting.
    pub async fn shutdown(mut self) {
        let watcher = Arc::clone(&self.watcher);
        if let Err(e) = tokio::task::spawn_blocking(move || watcher.stop()).await {
            tracing::error!(error = %e, "Failed to stop tail watcher");
        }

        self.cancel.cancel();
        if let Some(forwarder) = self.forwarder.take() {
            if let Err(e) = forwarder.await {
                tracing::error!(error = %e, "Line forwarder task failed");
            }
        }
        tracing::info!("Tail hub shut down");
    }
}

impl Drop for TailHub {
    fn drop(&mut self) {
        self.cancel.cancel();
        if self.watcher.state() != WatcherState::Running {
            return;
        }

        // Joining the polling thread must not block an async worker.
        let watcher = Arc::clone(&self.watcher);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || watcher.stop());
            }
            Err(_) => watcher.stop(),
        }
    }
}
