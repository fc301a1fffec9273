//! File tailing.
//!
//! Recovers the last lines of a file at startup and polls it for appended
//! lines.

mod backfill;
mod error;
mod line;
mod tailer;

pub use error::WatcherError;
pub use line::Line;
pub use tailer::{LineCallback, TailWatcher, WatcherState};
