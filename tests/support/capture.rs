// ABOUTME: In-memory stream endpoints for asserting what a session wrote.
// ABOUTME: Shared, broken, and keyboard-like streams plus a stand-in for process stdio.

use hostshell::ssh::{BoxedReader, BoxedWriter, StdioSource};
use parking_lot::Mutex;
use std::io::{self, Read};
use std::pin::Pin;
use std::sync::{Arc, mpsc};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// Writer whose clones all append to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

impl AsyncWrite for SharedBuf {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Stand-in for the process streams, so defaulting can be observed.
#[derive(Debug, Clone, Default)]
pub struct CapturingStdio {
    pub stdin: Vec<u8>,
    pub stdout: SharedBuf,
    pub stderr: SharedBuf,
}

impl CapturingStdio {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            stdin: input.to_vec(),
            ..Default::default()
        }
    }
}

impl StdioSource for CapturingStdio {
    fn stdin(&self) -> BoxedReader {
        Box::new(io::Cursor::new(self.stdin.clone()))
    }

    fn stdout(&self) -> BoxedWriter {
        Box::new(self.stdout.clone())
    }

    fn stderr(&self) -> BoxedWriter {
        Box::new(self.stderr.clone())
    }
}

/// Writer that fails every write, like a closed terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenPipe;

impl AsyncWrite for BrokenPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Blocking input that only yields what is typed through its sender.
pub struct Keyboard(mpsc::Receiver<Vec<u8>>);

impl Keyboard {
    pub fn new() -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self(rx))
    }
}

impl Read for Keyboard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.recv() {
            Ok(keys) => {
                buf[..keys.len()].copy_from_slice(&keys);
                Ok(keys.len())
            }
            Err(_) => Ok(0),
        }
    }
}
