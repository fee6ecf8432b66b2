//! Line-oriented capture of command output.

use crate::context::LogSink;
use crate::core::LogLevel;

/// Collects output lines and forwards each one to a stage's log sink.
///
/// Only trailing whitespace is removed from a line, so leading indentation
/// reaches the log and the captured text intact. Lines that are empty after
/// trimming are dropped.
#[derive(Debug)]
pub struct LogCapture {
    sink: LogSink,
    level: LogLevel,
    lines: Vec<String>,
}

impl LogCapture {
    /// Creates a capture logging at `level`.
    #[must_use]
    pub fn new(sink: LogSink, level: LogLevel) -> Self {
        Self {
            sink,
            level,
            lines: Vec::new(),
        }
    }

    /// Records one complete line, with or without its terminator.
    pub fn line(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let line = text.trim_end();
        if line.is_empty() {
            return;
        }
        self.sink.log(self.level, line);
        self.lines.push(line.to_string());
    }

    /// Returns the captured lines.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the captured lines joined by newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Reassembles lines from arbitrarily split chunks of one stream.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and records every line it completes.
    pub fn push(&mut self, chunk: &[u8], capture: &mut LogCapture) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            capture.line(&line);
        }
    }

    /// Records whatever is left as a final unterminated line.
    pub fn flush(&mut self, capture: &mut LogCapture) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            capture.line(&rest);
        }
    }
}
