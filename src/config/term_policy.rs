// ABOUTME: Policy for applying the local TERM variable to remote terminals.
// ABOUTME: Supports fallback-only (historic behaviour) and environment.

use serde::de::{self, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// How `TERM` from the local environment feeds the PTY request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermPolicy {
    /// Only an empty or unset `TERM` has an effect: the fallback type is used.
    /// A non-empty `TERM` is read but never applied, so the terminal type keeps
    /// whatever value it already had.
    #[default]
    FallbackOnly,
    /// A non-empty `TERM` becomes the terminal type, otherwise the fallback.
    Environment,
}

impl TermPolicy {
    /// Resolve the terminal type for a PTY request.
    ///
    /// `current` is the type already set on the session, `env_term` the
    /// value of `TERM` (if any).
    pub fn resolve(self, current: &str, env_term: Option<&str>, fallback: &str) -> String {
        let env_term = env_term.unwrap_or_default();
        match self {
            TermPolicy::FallbackOnly if env_term.is_empty() => fallback.to_string(),
            TermPolicy::FallbackOnly => current.to_string(),
            TermPolicy::Environment if env_term.is_empty() => fallback.to_string(),
            TermPolicy::Environment => env_term.to_string(),
        }
    }
}

impl FromStr for TermPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fallback-only" => Ok(TermPolicy::FallbackOnly),
            "environment" => Ok(TermPolicy::Environment),
            _ => Err(format!("unknown term policy: {}", s)),
        }
    }
}

impl fmt::Display for TermPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPolicy::FallbackOnly => write!(f, "fallback-only"),
            TermPolicy::Environment => write!(f, "environment"),
        }
    }
}

impl<'de> Deserialize<'de> for TermPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
