//! Streaming segment scanner
//!
//! Produces one trimmed segment line at a time from a byte stream, so memory
//! stays proportional to the largest buffered loop rather than the file.
//! Lines consumed ahead of the state machine (the control header and the
//! version line) are replayed through the pending queue instead of rewinding
//! the underlying reader.

use std::collections::VecDeque;
use std::io::{self, BufRead};

pub(crate) struct SegmentScanner<R> {
    input: R,
    terminator: u8,
    pending: VecDeque<String>,
}

impl<R: BufRead> SegmentScanner<R> {
    pub(crate) fn new(input: R, terminator: u8) -> Self {
        Self {
            input,
            terminator,
            pending: VecDeque::new(),
        }
    }

    /// Queue a line to be returned before reading further from the stream.
    pub(crate) fn replay(&mut self, line: String) {
        self.pending.push_back(line);
    }

    /// The next segment line, trimmed, without its terminator.
    pub(crate) fn next_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }
        Ok(self.read_raw()?.map(|(line, _)| line))
    }

    /// Like [`SegmentScanner::next_line`] but reporting whether the line was
    /// ended by the terminator (as opposed to end of input). Bypasses the
    /// pending queue; used for the version peek only.
    pub(crate) fn read_raw(&mut self) -> io::Result<Option<(String, bool)>> {
        let mut raw = Vec::new();
        let n = self.input.read_until(self.terminator, &mut raw)?;
        if n == 0 {
            return Ok(None);
        }
        let terminated = raw.last() == Some(&self.terminator);
        if terminated {
            raw.pop();
        }
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        Ok(Some((line, terminated)))
    }
}
