// ABOUTME: Moves bytes between local streams and a russh channel.
// ABOUTME: Tracks exit status, signal, and EOF to decide when a remote process is done.

use super::error::Result;
use super::stdio::{Reader, Stdio};
use russh::ChannelMsg;
use russh::client::Msg;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// How the remote process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Exit {
    Status(u32),
    Signal(String),
    /// The remote end refused the exec request.
    Rejected,
    /// The channel closed before any exit status arrived.
    Closed,
}

/// Collects the end-of-process messages of one channel.
///
/// A process is finished once it reported how it exited and the channel hit
/// EOF, in either order.
#[derive(Debug, Default)]
pub(crate) struct ExitTracker {
    exit: Option<Exit>,
    eof: bool,
}

impl ExitTracker {
    pub(crate) fn exit_status(&mut self, status: u32) {
        self.exit.get_or_insert(Exit::Status(status));
    }

    pub(crate) fn exit_signal(&mut self, signal: impl Into<String>) {
        self.exit.get_or_insert(Exit::Signal(signal.into()));
    }

    pub(crate) fn eof(&mut self) {
        self.eof = true;
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.exit.is_some() && self.eof
    }

    pub(crate) fn finish(self) -> Exit {
        self.exit.unwrap_or(Exit::Closed)
    }
}

/// Stream channel output to `stdio` and, if present, stdin to the channel,
/// until the remote process finishes or the channel closes.
pub(crate) async fn pump(channel: &mut russh::Channel<Msg>, stdio: Stdio<'_>) -> Result<Exit> {
    let Stdio {
        mut stdin,
        stdout,
        stderr,
    } = stdio;

    let mut tracker = ExitTracker::default();
    let mut input_closed = stdin.is_none();
    let mut buf = vec![0u8; 32 * 1024];

    loop {
        tokio::select! {
            // Local input
            r = read_input(&mut stdin, &mut buf), if !input_closed => {
                match r? {
                    0 => {
                        input_closed = true;
                        channel.eof().await?;
                    }
                    n => channel.data(&buf[..n]).await?,
                }
            }

            // Remote output
            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { ref data }) => {
                        stdout.write_all(data).await?;
                        stdout.flush().await?;
                    }
                    Some(ChannelMsg::ExtendedData { ref data, ext }) => {
                        if ext == 1 {
                            stderr.write_all(data).await?;
                            stderr.flush().await?;
                        }
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        tracker.exit_status(exit_status);
                        if tracker.is_finished() {
                            break;
                        }
                    }
                    Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                        tracker.exit_signal(format!("{:?}", signal_name));
                        if tracker.is_finished() {
                            break;
                        }
                    }
                    Some(ChannelMsg::Eof) => {
                        tracker.eof();
                        if tracker.is_finished() {
                            break;
                        }
                    }
                    Some(ChannelMsg::Failure) => return Ok(Exit::Rejected),
                    Some(ChannelMsg::Close) | None => break,
                    Some(_) => {}
                }
            }
        }
    }

    Ok(tracker.finish())
}

async fn read_input(stdin: &mut Option<&mut Reader>, buf: &mut [u8]) -> std::io::Result<usize> {
    match stdin {
        Some(reader) => reader.read(buf).await,
        None => Ok(0),
    }
}
