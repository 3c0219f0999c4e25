// ABOUTME: Stream endpoints wired into remote channels.
// ABOUTME: Provides process-level defaults through an injectable source.

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::io::{self, Read};
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

pub type Reader = dyn AsyncRead + Send + Unpin;
pub type Writer = dyn AsyncWrite + Send + Unpin;
pub type BoxedReader = Box<Reader>;
pub type BoxedWriter = Box<Writer>;

/// Streams attached to one channel for the duration of a `run` or `wait`.
pub struct Stdio<'a> {
    /// Input forwarded to the remote side. Batch commands never get one.
    pub stdin: Option<&'a mut Reader>,
    pub stdout: &'a mut Writer,
    pub stderr: &'a mut Writer,
}

impl std::fmt::Debug for Stdio<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stdio")
            .field("stdin", &self.stdin.is_some())
            .finish_non_exhaustive()
    }
}

/// Supplies the streams used when a session has none configured.
pub trait StdioSource: Send + Sync {
    fn stdin(&self) -> BoxedReader;
    fn stdout(&self) -> BoxedWriter;
    fn stderr(&self) -> BoxedWriter;
}

/// The current process's standard streams.
///
/// Input comes from one [`StdinPipe`] shared by the whole process, so a
/// terminal that returns while a read is pending leaves the next keystroke
/// for whoever reads stdin after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStdio;

impl StdioSource for ProcessStdio {
    fn stdin(&self) -> BoxedReader {
        static PROCESS_STDIN: OnceLock<StdinPipe> = OnceLock::new();
        Box::new(PROCESS_STDIN.get_or_init(|| StdinPipe::spawn(io::stdin())).clone())
    }

    fn stdout(&self) -> BoxedWriter {
        Box::new(tokio::io::stdout())
    }

    fn stderr(&self) -> BoxedWriter {
        Box::new(tokio::io::stderr())
    }
}

const PIPE_CHUNK: usize = 8 * 1024;
const PIPE_DEPTH: usize = 16;

/// Blocking input read on a dedicated thread and handed over as chunks.
///
/// A blocking read can't be cancelled. `tokio::io::stdin` runs it on the
/// blocking pool, so dropping the reader mid-read loses the bytes that read
/// returns and runtime shutdown waits for it to finish. Here the thread owns
/// the read for as long as the source lasts. Dropping a pending read only
/// drops the wait, and undelivered bytes stay queued for the next read.
///
/// Clones share the queue. The thread is detached and never joined.
#[derive(Clone)]
pub struct StdinPipe {
    shared: Arc<Mutex<PipeState>>,
}

struct PipeState {
    chunks: mpsc::Receiver<io::Result<Bytes>>,
    pending: BytesMut,
}

impl std::fmt::Debug for StdinPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdinPipe")
            .field("pending", &self.shared.lock().pending.len())
            .finish()
    }
}

impl StdinPipe {
    /// Start the reader thread over `source`.
    ///
    /// If the thread can't be started the pipe reports end of input.
    pub fn spawn(source: impl Read + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel(PIPE_DEPTH);
        let spawned = std::thread::Builder::new()
            .name("hostshell-stdin".to_string())
            .spawn(move || feed(source, tx));
        if let Err(e) = spawned {
            tracing::warn!("Failed to start stdin reader thread: {}", e);
        }

        Self {
            shared: Arc::new(Mutex::new(PipeState {
                chunks: rx,
                pending: BytesMut::new(),
            })),
        }
    }
}

fn feed(mut source: impl Read, tx: mpsc::Sender<io::Result<Bytes>>) {
    let mut buf = vec![0u8; PIPE_CHUNK];
    loop {
        let chunk = match source.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => Ok(Bytes::copy_from_slice(&buf[..n])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };
        let failed = chunk.is_err();
        if tx.blocking_send(chunk).is_err() || failed {
            return;
        }
    }
}

impl AsyncRead for StdinPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;

        if state.pending.is_empty() {
            match ready!(state.chunks.poll_recv(cx)) {
                Some(Ok(chunk)) => state.pending.extend_from_slice(&chunk),
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Source exhausted
                None => return Poll::Ready(Ok(())),
            }
        }

        let n = state.pending.len().min(buf.remaining());
        buf.put_slice(&state.pending.split_to(n));
        Poll::Ready(Ok(()))
    }
}

/// Borrow the configured stream, or materialize a default into `fallback`.
pub(crate) fn resolve_reader<'a>(
    configured: &'a mut Option<BoxedReader>,
    fallback: &'a mut Option<BoxedReader>,
    make: impl FnOnce() -> BoxedReader,
) -> &'a mut Reader {
    match configured {
        Some(reader) => reader.as_mut(),
        None => fallback.insert(make()).as_mut(),
    }
}

/// Writer counterpart of [`resolve_reader`].
pub(crate) fn resolve_writer<'a>(
    configured: &'a mut Option<BoxedWriter>,
    fallback: &'a mut Option<BoxedWriter>,
    make: impl FnOnce() -> BoxedWriter,
) -> &'a mut Writer {
    match configured {
        Some(writer) => writer.as_mut(),
        None => fallback.insert(make()).as_mut(),
    }
}
