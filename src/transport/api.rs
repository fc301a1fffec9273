//! API response types for the HTTP endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::watcher::WatcherState;

/// Response for GET /api/history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// History window, oldest first.
    pub lines: Vec<String>,
}

/// Response for GET /api/status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Path of the tailed file.
    pub path: String,
    /// Watcher lifecycle state.
    pub state: WatcherState,
    /// Byte offset just past the last consumed line.
    pub offset: u64,
    /// Number of connected stream subscribers.
    pub subscribers: usize,
    /// Number of lines currently in the history window.
    pub history_len: usize,
    /// When the server started.
    pub started_at: DateTime<Utc>,
}
