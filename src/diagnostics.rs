// ABOUTME: Diagnostics accumulator for non-fatal warnings during remote execution.
// ABOUTME: Collects warnings that shouldn't fail a run but should be visible to callers.

/// Collects non-fatal warnings during session operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Drop all collected warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
    }
}

/// A non-fatal warning collected during a session operation.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a channel close warning.
    pub fn channel_close(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ChannelClose,
            message: message.into(),
        }
    }

    /// Create a warning for commands dropped after a failure.
    pub fn abandoned_commands(count: usize) -> Self {
        Self {
            kind: WarningKind::AbandonedCommands,
            message: format!("{} queued command(s) abandoned after failure", count),
        }
    }
}

/// Categories of warnings that can occur during a session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to close a per-command or terminal channel.
    ChannelClose,
    /// A failing command stopped the run and later commands were discarded.
    AbandonedCommands,
}
