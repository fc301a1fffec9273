//! Line framing for tailed bytes.

use serde::{Deserialize, Serialize};

/// A complete line read from the tailed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Position in the stream of lines emitted by one watcher, starting at 0.
    pub seq: u64,
    /// Line content without its terminator.
    pub text: String,
}

impl Line {
    #[must_use]
    pub fn new(seq: u64, text: impl Into<String>) -> Self {
        Self {
            seq,
            text: text.into(),
        }
    }
}

/// Split `buf` into the complete lines it contains.
///
/// Returns the decoded lines and the number of bytes they span, including the
/// final `\n`. Bytes after the last `\n` are left unconsumed.
pub(crate) fn split_complete(buf: &[u8]) -> (Vec<String>, usize) {
    let Some(last) = buf.iter().rposition(|&b| b == b'\n') else {
        return (Vec::new(), 0);
    };

    let lines = buf[..last].split(|&b| b == b'\n').map(decode).collect();
    (lines, last + 1)
}

fn decode(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
