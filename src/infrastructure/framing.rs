//! Newline-delimited message framing
//!
//! Used for client sockets and for worker stdout/stderr alike. One logical
//! message per `\n`-terminated line; surrounding whitespace is trimmed and
//! blank lines are skipped. Invalid UTF-8 is replaced rather than treated as a
//! stream error, so the dispatcher can answer it with a parse error.

use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Yields one trimmed, non-empty line per call.
pub struct MessageFramer<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> MessageFramer<R> {
    /// Frame messages read from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Next message, or `None` once the stream is exhausted.
    ///
    /// A final line without a trailing newline is still returned.
    pub async fn next_message(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf).await?;
            if read == 0 {
                return Ok(None);
            }

            let line = String::from_utf8_lossy(&self.buf);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_owned()));
            }
        }
    }
}
