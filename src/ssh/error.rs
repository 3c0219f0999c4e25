// ABOUTME: Remote session error types.
// ABOUTME: Covers queuing, channel, PTY, shell, command, and teardown failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("command queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("failed to open channel: {0}")]
    SessionOpen(String),

    #[error("PTY request rejected: {0}")]
    PtyRequest(String),

    #[error("failed to start shell: {0}")]
    ShellStart(String),

    #[error("command `{command}` exited with status {status}")]
    CommandExit { command: String, status: u32 },

    #[error("command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("remote shell exited with status {0}")]
    ShellExit(u32),

    #[error("remote shell terminated abnormally: {0}")]
    Wait(String),

    #[error("failed to close connection: {0}")]
    Close(String),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure recorded while queuing a command, surfaced later by `run`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("command contains an embedded newline: {0:?}")]
    EmbeddedNewline(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Queuing a command failed.
    Queue,
    /// The transport refused to open a channel.
    SessionOpen,
    /// The remote end rejected PTY negotiation.
    PtyRequest,
    /// The remote end could not start a shell.
    ShellStart,
    /// A queued command exited abnormally or its channel failed mid-run.
    CommandExecution,
    /// The interactive shell terminated abnormally.
    Wait,
    /// Tearing down the connection failed.
    Close,
    /// Transport-level protocol or I/O failure.
    Transport,
}

impl Error {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Queue(_) => ErrorKind::Queue,
            Error::SessionOpen(_) => ErrorKind::SessionOpen,
            Error::PtyRequest(_) => ErrorKind::PtyRequest,
            Error::ShellStart(_) => ErrorKind::ShellStart,
            Error::CommandExit { .. } | Error::CommandFailed { .. } => {
                ErrorKind::CommandExecution
            }
            Error::ShellExit(_) | Error::Wait(_) => ErrorKind::Wait,
            Error::Close(_) => ErrorKind::Close,
            Error::ChannelClosed | Error::Protocol(_) | Error::Io(_) => ErrorKind::Transport,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
