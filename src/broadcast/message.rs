//! Messages delivered to subscribers.

use serde::{Deserialize, Serialize};

/// A message sent to one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// History window, sent once when the subscriber joins.
    Initial { lines: Vec<String> },
    /// One newly appended line.
    Update { line: String },
}

impl Message {
    /// Event name used by streaming transports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Update { .. } => "update",
        }
    }
}
