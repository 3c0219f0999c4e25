// ABOUTME: Remote execution over an authenticated SSH connection.
// ABOUTME: Interactive terminals and queued batch commands, one channel per use.

mod client;
mod error;
mod pump;
mod queue;
mod session;
mod stdio;
mod transport;

pub use client::{SshChannel, SshTransport};
pub use error::{Error, ErrorKind, QueueError, Result};
pub use queue::CommandQueue;
pub use session::RemoteSession;
pub use stdio::{
    BoxedReader, BoxedWriter, ProcessStdio, Reader, StdinPipe, Stdio, StdioSource, Writer,
};
pub use transport::{Channel, PtyRequest, TerminalMode, TerminalModes, Transport};
