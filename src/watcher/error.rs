//! Watcher error types.

use crate::history::HistoryError;

/// Errors that can occur while building or driving a tail watcher.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// `start` was called while the polling loop is already running.
    #[error("Tail watcher is already running")]
    AlreadyRunning,

    /// The watcher was stopped and cannot be restarted or reconfigured.
    #[error("Tail watcher has been stopped")]
    Stopped,

    /// A configuration value is unusable.
    #[error("Invalid watcher configuration: {0}")]
    InvalidConfig(String),

    /// History buffer could not be created.
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// The polling thread could not be spawned.
    #[error("Failed to spawn polling thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_display() {
        assert_eq!(
            WatcherError::AlreadyRunning.to_string(),
            "Tail watcher is already running"
        );
    }

    #[test]
    fn test_stopped_display() {
        assert_eq!(
            WatcherError::Stopped.to_string(),
            "Tail watcher has been stopped"
        );
    }

    #[test]
    fn test_from_history_error() {
        let err: WatcherError = HistoryError::ZeroCapacity.into();
        assert!(matches!(err, WatcherError::History(_)));
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let watcher_err: WatcherError = io_err.into();
        assert!(matches!(watcher_err, WatcherError::Io(_)));
        assert!(watcher_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        use std::error::Error;

        let err = WatcherError::Spawn(std::io::Error::other("no threads left"));
        assert!(err.to_string().starts_with("Failed to spawn polling thread"));
        assert!(err.source().is_some());
    }
}
