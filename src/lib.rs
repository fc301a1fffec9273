//! Tailcast - tail a growing file and stream new lines to live subscribers.

pub mod broadcast;
pub mod config;
pub mod history;
pub mod hub;
pub mod transport;
pub mod watcher;
