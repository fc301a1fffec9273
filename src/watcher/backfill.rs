//! Startup recovery of the last lines of a file.
//!
//! Scans backward from the end in fixed-size chunks so that large files are
//! never read in full.

use std::io::{self, Read, Seek, SeekFrom};

use super::line::split_complete;

/// Lines recovered from the end of a file.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Backfill {
    /// Last complete lines, oldest first.
    pub lines: Vec<String>,
    /// Byte offset just past the last complete line.
    pub end: u64,
}

/// Read at most `count` complete lines from the end of `file`.
///
/// `size` is the file length to treat as end-of-file. A trailing fragment
/// without a terminator is not returned and `end` stops before it.
pub(crate) fn read_last_lines<R: Read + Seek>(
    file: &mut R,
    size: u64,
    count: usize,
    chunk_size: usize,
) -> io::Result<Backfill> {
    let mut buf = vec![0u8; chunk_size];
    let mut pos = size;
    let mut last_newline = None;
    let mut found = 0usize;
    let mut start = 0u64;

    // The newline that ends the last kept line plus one newline per kept
    // line before it: `count + 1` terminators bound `count` lines.
    'scan: while pos > 0 {
        let len = usize::try_from(pos).map_or(chunk_size, |remaining| remaining.min(chunk_size));
        pos -= len as u64;

        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut buf[..len])?;

        for (i, &byte) in buf[..len].iter().enumerate().rev() {
            if byte != b'\n' {
                continue;
            }
            let at = pos + i as u64;
            last_newline.get_or_insert(at);
            found += 1;
            if found > count {
                start = at + 1;
                break 'scan;
            }
        }
    }

    let Some(last_newline) = last_newline else {
        return Ok(Backfill::default());
    };
    let end = last_newline + 1;

    let window = usize::try_from(end - start)
        .map_err(|_| io::Error::other("history window does not fit in memory"))?;
    let mut bytes = vec![0u8; window];
    file.seek(SeekFrom::Start(start))?;
    file.read_exact(&mut bytes)?;

    let (lines, _) = split_complete(&bytes);
    Ok(Backfill { lines, end })
}
