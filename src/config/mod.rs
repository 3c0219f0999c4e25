// ABOUTME: Configuration types and parsing for remote terminal sessions.
// ABOUTME: Handles YAML parsing, defaults, and validation of PTY settings.

mod term_policy;

pub use term_policy::TermPolicy;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_TERM: &str = "xterm-256color";
pub const DEFAULT_ROWS: u32 = 40;
pub const DEFAULT_COLUMNS: u32 = 80;
pub const DEFAULT_SPEED: u32 = 14400;

/// Settings applied to every PTY request made by `RemoteSession::terminal`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalConfig {
    #[serde(default)]
    pub term_policy: TermPolicy,

    #[serde(default = "default_fallback_term")]
    pub fallback_term: String,

    #[serde(default = "default_rows")]
    pub rows: u32,

    #[serde(default = "default_columns")]
    pub columns: u32,

    /// Baud rate requested for both input and output speed.
    #[serde(default = "default_speed")]
    pub speed: u32,
}

fn default_fallback_term() -> String {
    DEFAULT_TERM.to_string()
}

fn default_rows() -> u32 {
    DEFAULT_ROWS
}

fn default_columns() -> u32 {
    DEFAULT_COLUMNS
}

fn default_speed() -> u32 {
    DEFAULT_SPEED
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            term_policy: TermPolicy::default(),
            fallback_term: default_fallback_term(),
            rows: default_rows(),
            columns: default_columns(),
            speed: default_speed(),
        }
    }
}

impl TerminalConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TerminalConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn term_policy(mut self, policy: TermPolicy) -> Self {
        self.term_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.fallback_term.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "fallback_term cannot be empty".to_string(),
            ));
        }
        if self.rows == 0 || self.columns == 0 {
            return Err(Error::InvalidConfig(format!(
                "terminal geometry must be non-zero, got {}x{}",
                self.rows, self.columns
            )));
        }
        if self.speed == 0 {
            return Err(Error::InvalidConfig(
                "terminal speed must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
