// ABOUTME: Transport implementation backed by a connected russh client handle.
// ABOUTME: Opens session channels, negotiates PTYs, and runs commands or shells.

use super::error::{Error, Result};
use super::pump::{Exit, pump};
use super::stdio::Stdio;
use super::transport::{Channel, PtyRequest, TerminalMode, Transport};
use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{ChannelMsg, Disconnect, Pty};

/// An authenticated SSH connection.
///
/// Connecting and authenticating is left to the caller; this only takes
/// over the resulting handle.
pub struct SshTransport<H: client::Handler> {
    handle: Handle<H>,
}

impl<H: client::Handler> std::fmt::Debug for SshTransport<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport")
            .field("handle", &"<russh::Handle>")
            .field("closed", &self.handle.is_closed())
            .finish()
    }
}

impl<H: client::Handler> SshTransport<H> {
    pub fn new(handle: Handle<H>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle<H> {
        &self.handle
    }
}

#[async_trait]
impl<H> Transport for SshTransport<H>
where
    H: client::Handler + 'static,
    Handle<H>: Send + Sync,
{
    type Channel = SshChannel;

    async fn open_channel(&self) -> Result<SshChannel> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::SessionOpen(e.to_string()))?;
        Ok(SshChannel::new(channel))
    }

    async fn close(&self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| Error::Close(e.to_string()))
    }
}

/// A session channel on an SSH connection.
pub struct SshChannel {
    inner: russh::Channel<Msg>,
}

impl std::fmt::Debug for SshChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshChannel")
            .field("id", &self.inner.id())
            .finish()
    }
}

impl SshChannel {
    pub fn new(inner: russh::Channel<Msg>) -> Self {
        Self { inner }
    }

    /// Wait for the reply to a `want_reply` request.
    ///
    /// Returns whether the remote end accepted it.
    async fn await_reply(&mut self) -> Result<bool> {
        loop {
            match self.inner.wait().await {
                Some(ChannelMsg::Success) => return Ok(true),
                Some(ChannelMsg::Failure) => return Ok(false),
                Some(ChannelMsg::Close) | None => return Err(Error::ChannelClosed),
                Some(_) => {}
            }
        }
    }
}

fn pty_mode(mode: TerminalMode) -> Pty {
    match mode {
        TerminalMode::InputSpeed => Pty::TTY_OP_ISPEED,
        TerminalMode::OutputSpeed => Pty::TTY_OP_OSPEED,
    }
}

#[async_trait]
impl Channel for SshChannel {
    async fn request_pty(&mut self, pty: &PtyRequest) -> Result<()> {
        let modes: Vec<(Pty, u32)> = pty
            .modes
            .iter()
            .map(|(&mode, &value)| (pty_mode(mode), value))
            .collect();

        self.inner
            .request_pty(true, &pty.term, pty.columns, pty.rows, 0, 0, &modes)
            .await
            .map_err(|e| Error::PtyRequest(e.to_string()))?;

        let accepted = self
            .await_reply()
            .await
            .map_err(|e| Error::PtyRequest(e.to_string()))?;
        if !accepted {
            return Err(Error::PtyRequest(format!(
                "remote refused {} terminal ({}x{})",
                pty.term, pty.columns, pty.rows
            )));
        }
        Ok(())
    }

    async fn shell(&mut self) -> Result<()> {
        self.inner
            .request_shell(true)
            .await
            .map_err(|e| Error::ShellStart(e.to_string()))?;

        let accepted = self
            .await_reply()
            .await
            .map_err(|e| Error::ShellStart(e.to_string()))?;
        if !accepted {
            return Err(Error::ShellStart("remote refused shell request".to_string()));
        }
        Ok(())
    }

    async fn wait(&mut self, stdio: Stdio<'_>) -> Result<()> {
        let exit = pump(&mut self.inner, stdio)
            .await
            .map_err(|e| Error::Wait(e.to_string()))?;

        match exit {
            Exit::Status(0) => Ok(()),
            Exit::Status(status) => Err(Error::ShellExit(status)),
            Exit::Signal(signal) => Err(Error::Wait(format!("killed by signal {}", signal))),
            Exit::Rejected => Err(Error::Wait("remote rejected request".to_string())),
            Exit::Closed => Err(Error::Wait(
                "channel closed without exit status".to_string(),
            )),
        }
    }

    async fn run(&mut self, command: &str, stdio: Stdio<'_>) -> Result<()> {
        let failed = |reason: &str| Error::CommandFailed {
            command: command.to_string(),
            reason: reason.to_string(),
        };

        self.inner
            .exec(true, command)
            .await
            .map_err(|e| failed(&format!("failed to exec command: {}", e)))?;

        let exit = pump(&mut self.inner, stdio)
            .await
            .map_err(|e| failed(&e.to_string()))?;

        match exit {
            Exit::Status(0) => Ok(()),
            Exit::Status(status) => Err(Error::CommandExit {
                command: command.to_string(),
                status,
            }),
            Exit::Signal(signal) => Err(failed(&format!("killed by signal {}", signal))),
            Exit::Rejected => Err(failed("remote rejected exec request")),
            Exit::Closed => Err(failed("channel closed without exit status")),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await.map_err(Error::Protocol)
    }
}
