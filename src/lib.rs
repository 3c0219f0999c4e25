// ABOUTME: Library root for hostshell - remote terminals and command queues over SSH.
// ABOUTME: The ssh module holds the session core; config and diagnostics support it.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ssh;
