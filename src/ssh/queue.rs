// ABOUTME: FIFO buffer of newline-terminated commands awaiting execution.
// ABOUTME: Records the first queuing failure and keeps it until the queue is dropped.

use super::error::QueueError;
use bytes::{BufMut, BytesMut};

/// Ordered queue of pending commands.
///
/// Commands are stored back to back in a single byte buffer, each followed
/// by `\n`. Popping reads destructively from the front.
#[derive(Debug, Default)]
pub struct CommandQueue {
    buf: BytesMut,
    len: usize,
    err: Option<QueueError>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    ///
    /// A command with an embedded newline cannot be framed, so it sets the
    /// sticky error instead. Once an error is set, later pushes are ignored.
    pub fn push(&mut self, command: &str) {
        if self.err.is_some() {
            tracing::debug!("Ignoring command queued after earlier failure: {}", command);
            return;
        }

        if command.contains('\n') {
            self.err = Some(QueueError::EmbeddedNewline(command.to_string()));
            return;
        }

        self.buf.reserve(command.len() + 1);
        self.buf.put_slice(command.as_bytes());
        self.buf.put_u8(b'\n');
        self.len += 1;
    }

    /// Remove and return the oldest command, without its trailing newline.
    pub fn pop(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf.split_to(end + 1);
        self.len -= 1;
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }

    /// Number of commands waiting to run.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Discard every pending command. The sticky error is kept.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.len = 0;
    }

    /// The first queuing failure, if any.
    pub fn error(&self) -> Option<&QueueError> {
        self.err.as_ref()
    }
}
