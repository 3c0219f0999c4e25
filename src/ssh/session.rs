// ABOUTME: Remote session orchestration over an authenticated transport.
// ABOUTME: Attaches interactive terminals and runs queued commands one channel at a time.

use super::error::Result;
use super::queue::CommandQueue;
use super::stdio::{
    BoxedReader, BoxedWriter, ProcessStdio, Stdio, StdioSource, resolve_reader, resolve_writer,
};
use super::transport::{Channel, PtyRequest, Transport};
use crate::config::TerminalConfig;
use crate::diagnostics::{Diagnostics, Warning};
use std::ffi::OsString;
use tokio::io::{AsyncRead, AsyncWrite};

/// A remote host reachable through one exclusively owned transport connection.
///
/// Every `run` command and every `terminal` attachment gets a fresh channel
/// that is closed before the call returns, whatever the outcome.
pub struct RemoteSession<T: Transport> {
    transport: T,
    stdio_source: Box<dyn StdioSource>,
    stdin: Option<BoxedReader>,
    stdout: Option<BoxedWriter>,
    stderr: Option<BoxedWriter>,
    pty: PtyRequest,
    config: TerminalConfig,
    queue: CommandQueue,
    diagnostics: Diagnostics,
}

impl<T: Transport> std::fmt::Debug for RemoteSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("transport", &"<Transport>")
            .field("pty", &self.pty)
            .field("config", &self.config)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RemoteSession<T> {
    pub fn new(transport: T) -> Self {
        Self::build(transport, TerminalConfig::default())
    }

    /// Create a session with custom terminal settings.
    ///
    /// The config is validated here, so struct literals get the same checks
    /// as `TerminalConfig::from_yaml`.
    pub fn with_config(transport: T, config: TerminalConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: T, config: TerminalConfig) -> Self {
        Self {
            transport,
            stdio_source: Box::new(ProcessStdio),
            stdin: None,
            stdout: None,
            stderr: None,
            pty: PtyRequest::default(),
            config,
            queue: CommandQueue::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Replace the source of streams used when none are configured.
    pub fn with_stdio_source(mut self, source: impl StdioSource + 'static) -> Self {
        self.stdio_source = Box::new(source);
        self
    }

    /// Set the input forwarded to interactive terminals.
    pub fn set_stdin(&mut self, stdin: impl AsyncRead + Send + Unpin + 'static) -> &mut Self {
        self.stdin = Some(Box::new(stdin));
        self
    }

    /// Replace the output and error sinks for later `run` and `terminal` calls.
    pub fn set_stdio(
        &mut self,
        stdout: impl AsyncWrite + Send + Unpin + 'static,
        stderr: impl AsyncWrite + Send + Unpin + 'static,
    ) -> &mut Self {
        self.stdout = Some(Box::new(stdout));
        self.stderr = Some(Box::new(stderr));
        self
    }

    /// Set the terminal type. Under `TermPolicy::FallbackOnly` this value is
    /// kept whenever `TERM` is non-empty.
    pub fn set_term(&mut self, term: impl Into<String>) -> &mut Self {
        self.pty.term = term.into();
        self
    }

    /// The PTY parameters from the most recent `terminal` call.
    pub fn pty(&self) -> &PtyRequest {
        &self.pty
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Number of commands waiting for `run`.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Hand over the warnings collected so far and start a fresh set.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Queue a command for the next `run`.
    ///
    /// Queuing failures are not reported here; the first one is returned by
    /// every later `run`.
    pub fn cmd(&mut self, command: impl AsRef<str>) -> &mut Self {
        self.queue.push(command.as_ref());
        self
    }

    /// Run every queued command in order, each on its own channel.
    ///
    /// Stops at the first failure and discards the commands behind it.
    /// With nothing queued this succeeds without touching the transport.
    pub async fn run(&mut self) -> Result<()> {
        if let Some(err) = self.queue.error() {
            return Err(err.clone().into());
        }

        while let Some(command) = self.queue.pop() {
            if let Err(e) = self.execute(&command).await {
                let abandoned = self.queue.len();
                if abandoned > 0 {
                    self.queue.clear();
                    self.diagnostics.warn(Warning::abandoned_commands(abandoned));
                }
                return Err(e);
            }
        }

        Ok(())
    }

    /// Attach an interactive shell and block until it exits.
    pub async fn terminal(&mut self) -> Result<()> {
        let mut channel = self.transport.open_channel().await?;
        tracing::debug!("Opened terminal channel");

        let result = self.attach(&mut channel).await;
        self.close_channel(&mut channel).await;
        result
    }

    /// Close the transport connection.
    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }

    async fn execute(&mut self, command: &str) -> Result<()> {
        tracing::debug!("Running queued command: {}", command);
        let mut channel = self.transport.open_channel().await?;

        let mut default_stdout = None;
        let mut default_stderr = None;
        let source = &self.stdio_source;
        let stdio = Stdio {
            stdin: None,
            stdout: resolve_writer(&mut self.stdout, &mut default_stdout, || source.stdout()),
            stderr: resolve_writer(&mut self.stderr, &mut default_stderr, || source.stderr()),
        };

        let result = channel.run(command, stdio).await;
        self.close_channel(&mut channel).await;
        result
    }

    async fn attach(&mut self, channel: &mut T::Channel) -> Result<()> {
        self.negotiate_pty(std::env::var_os("TERM"));

        channel.request_pty(&self.pty).await?;
        channel.shell().await?;
        tracing::info!(
            "Attached terminal {} ({}x{})",
            self.pty.term,
            self.pty.columns,
            self.pty.rows
        );

        let mut default_stdin = None;
        let mut default_stdout = None;
        let mut default_stderr = None;
        let source = &self.stdio_source;
        let stdio = Stdio {
            stdin: Some(resolve_reader(&mut self.stdin, &mut default_stdin, || {
                source.stdin()
            })),
            stdout: resolve_writer(&mut self.stdout, &mut default_stdout, || source.stdout()),
            stderr: resolve_writer(&mut self.stderr, &mut default_stderr, || source.stderr()),
        };

        channel.wait(stdio).await
    }

    /// Recompute the PTY request from config, overwriting caller-set values.
    ///
    /// A `TERM` that isn't valid UTF-8 still counts as set.
    fn negotiate_pty(&mut self, env_term: Option<OsString>) {
        let env_term = env_term.as_deref().map(|term| term.to_string_lossy());
        let config = &self.config;
        self.pty.term =
            config
                .term_policy
                .resolve(&self.pty.term, env_term.as_deref(), &config.fallback_term);
        self.pty.rows = config.rows;
        self.pty.columns = config.columns;
        self.pty.modes = PtyRequest::speed_modes(config.speed);
    }

    async fn close_channel(&mut self, channel: &mut T::Channel) {
        match channel.close().await {
            Ok(()) => tracing::debug!("Closed channel"),
            Err(e) => self
                .diagnostics
                .warn(Warning::channel_close(format!("failed to close channel: {}", e))),
        }
    }
}
