// ABOUTME: Capability traits for an authenticated connection and its channels.
// ABOUTME: Defines Transport, Channel, and the PTY request they negotiate.

use super::error::Result;
use super::stdio::Stdio;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// An authenticated connection able to open independent channels.
#[async_trait]
pub trait Transport: Send + Sync {
    type Channel: Channel;

    /// Open one logical channel over the shared connection.
    async fn open_channel(&self) -> Result<Self::Channel>;

    /// Terminate the underlying connection.
    async fn close(&self) -> Result<()>;
}

/// One logical channel, used for a single command or shell, then discarded.
///
/// Each operation reports failures under its own error variant, including
/// I/O and protocol failures hit along the way: `request_pty` as
/// `PtyRequest`, `shell` as `ShellStart`, `wait` as `ShellExit` or `Wait`,
/// and `run` as `CommandExit` or `CommandFailed`.
#[async_trait]
pub trait Channel: Send {
    /// Ask the remote end for a pseudo-terminal.
    async fn request_pty(&mut self, pty: &PtyRequest) -> Result<()>;

    /// Start an interactive shell.
    async fn shell(&mut self) -> Result<()>;

    /// Stream I/O until the shell exits. A non-zero or abnormal exit is an error.
    async fn wait(&mut self, stdio: Stdio<'_>) -> Result<()>;

    /// Execute `command` and stream its output until it exits.
    async fn run(&mut self, command: &str, stdio: Stdio<'_>) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Terminal attributes sent during PTY negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TerminalMode {
    InputSpeed,
    OutputSpeed,
}

pub type TerminalModes = BTreeMap<TerminalMode, u32>;

/// Pseudo-terminal type, geometry, and mode table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: String,
    pub rows: u32,
    pub columns: u32,
    pub modes: TerminalModes,
}

impl PtyRequest {
    /// Mode table requesting `speed` baud in both directions.
    pub fn speed_modes(speed: u32) -> TerminalModes {
        TerminalModes::from([
            (TerminalMode::InputSpeed, speed),
            (TerminalMode::OutputSpeed, speed),
        ])
    }
}
