// ABOUTME: Scripted in-memory Transport for exercising RemoteSession without a server.
// ABOUTME: Records every channel operation and injects failures on demand.

use async_trait::async_trait;
use hostshell::ssh::{Channel, Error, PtyRequest, Result, Stdio, Transport};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// One observed operation, tagged with the channel it happened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(usize),
    Run(usize, String),
    RequestPty(usize, PtyRequest),
    Shell(usize),
    Wait(usize),
    CloseChannel(usize),
    CloseTransport,
}

/// Failures the stub should produce.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Fail the nth channel open (0-based).
    pub fail_open_at: Option<usize>,
    /// Queued command that exits with status 1.
    pub fail_command: Option<String>,
    pub fail_pty: bool,
    pub fail_shell: bool,
    /// Interactive shell exits with this status instead of 0.
    pub shell_exit: Option<u32>,
    pub fail_channel_close: bool,
}

#[derive(Debug, Default)]
struct State {
    script: Script,
    events: Vec<Event>,
    opened: usize,
    open_channels: BTreeSet<usize>,
    closed: bool,
}

/// Read side of the stub, kept by the test after the transport moves into a session.
#[derive(Debug, Clone)]
pub struct StubLog(Arc<Mutex<State>>);

impl StubLog {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().events.clone()
    }

    /// Commands run, in order.
    pub fn commands(&self) -> Vec<String> {
        self.0
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Run(_, command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn channels_opened(&self) -> usize {
        self.0.lock().opened
    }

    pub fn open_channels(&self) -> usize {
        self.0.lock().open_channels.len()
    }

    pub fn close_count(&self, id: usize) -> usize {
        self.0
            .lock()
            .events
            .iter()
            .filter(|e| **e == Event::CloseChannel(id))
            .count()
    }

    pub fn last_pty(&self) -> Option<PtyRequest> {
        self.0.lock().events.iter().rev().find_map(|e| match e {
            Event::RequestPty(_, pty) => Some(pty.clone()),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub struct StubTransport(Arc<Mutex<State>>);

impl StubTransport {
    pub fn new(script: Script) -> (Self, StubLog) {
        let state = Arc::new(Mutex::new(State {
            script,
            ..Default::default()
        }));
        (Self(Arc::clone(&state)), StubLog(state))
    }

    /// A transport that always succeeds.
    pub fn healthy() -> (Self, StubLog) {
        Self::new(Script::default())
    }

    /// A transport whose connection was already closed elsewhere.
    pub fn already_closed() -> (Self, StubLog) {
        let (transport, log) = Self::healthy();
        transport.0.lock().closed = true;
        (transport, log)
    }
}

#[async_trait]
impl Transport for StubTransport {
    type Channel = StubChannel;

    async fn open_channel(&self) -> Result<StubChannel> {
        let mut state = self.0.lock();
        let id = state.opened;
        if state.script.fail_open_at == Some(id) {
            return Err(Error::SessionOpen(format!("channel {} refused", id)));
        }
        state.opened += 1;
        state.open_channels.insert(id);
        state.events.push(Event::Open(id));
        Ok(StubChannel {
            id,
            state: Arc::clone(&self.0),
        })
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.0.lock();
        if state.closed {
            return Err(Error::Close("connection already closed".to_string()));
        }
        state.closed = true;
        state.events.push(Event::CloseTransport);
        Ok(())
    }
}

#[derive(Debug)]
pub struct StubChannel {
    id: usize,
    state: Arc<Mutex<State>>,
}

impl StubChannel {
    fn record(&self, event: Event) -> Script {
        let mut state = self.state.lock();
        state.events.push(event);
        state.script.clone()
    }
}

#[async_trait]
impl Channel for StubChannel {
    async fn request_pty(&mut self, pty: &PtyRequest) -> Result<()> {
        let script = self.record(Event::RequestPty(self.id, pty.clone()));
        if script.fail_pty {
            return Err(Error::PtyRequest("pty refused".to_string()));
        }
        Ok(())
    }

    async fn shell(&mut self) -> Result<()> {
        let script = self.record(Event::Shell(self.id));
        if script.fail_shell {
            return Err(Error::ShellStart("shell refused".to_string()));
        }
        Ok(())
    }

    /// Echoes stdin to stdout, then exits.
    async fn wait(&mut self, stdio: Stdio<'_>) -> Result<()> {
        let script = self.record(Event::Wait(self.id));

        if let Some(stdin) = stdio.stdin {
            let mut input = Vec::new();
            stdin.read_to_end(&mut input).await?;
            stdio.stdout.write_all(&input).await?;
        }
        stdio.stderr.write_all(b"shell done\n").await?;

        match script.shell_exit {
            Some(status) => Err(Error::ShellExit(status)),
            None => Ok(()),
        }
    }

    /// Writes the command to stdout and `err:<command>` to stderr.
    async fn run(&mut self, command: &str, stdio: Stdio<'_>) -> Result<()> {
        let script = self.record(Event::Run(self.id, command.to_string()));
        assert!(stdio.stdin.is_none(), "batch commands must not get stdin");

        stdio.stdout.write_all(format!("{}\n", command).as_bytes()).await?;
        stdio
            .stderr
            .write_all(format!("err:{}\n", command).as_bytes())
            .await?;

        if script.fail_command.as_deref() == Some(command) {
            return Err(Error::CommandExit {
                command: command.to_string(),
                status: 1,
            });
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let script = {
            let mut state = self.state.lock();
            state.open_channels.remove(&self.id);
            state.events.push(Event::CloseChannel(self.id));
            state.script.clone()
        };
        if script.fail_channel_close {
            return Err(Error::ChannelClosed);
        }
        Ok(())
    }
}
