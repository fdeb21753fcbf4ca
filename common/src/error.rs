//! # Error Taxonomy
//!
//! Only [`LoadError`] is fatal to a run. The other three are scoped to a single
//! host: they end up in that host's report and never reach sibling hosts.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The inventory could not be turned into a snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read inventory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid YAML or does not have the inventory shape.
    #[error("failed to parse inventory: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A host entry is present but unusable.
    #[error("host '{host}' is invalid: {reason}")]
    InvalidHost { host: String, reason: String },
    /// The inventory declares no nodes at all.
    #[error("inventory does not contain any nodes")]
    Empty,
}

/// A host's session never reached the opened state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenError {
    /// The connection itself failed (resolution, TCP, handshake).
    #[error("connection failed: {0}")]
    Connect(String),
    /// The device refused the credentials.
    #[error("authentication rejected for user '{user}'")]
    Auth { user: String },
    #[error("no session after {0:?}")]
    Timeout(Duration),
    /// The run was cancelled before the session opened.
    #[error("cancelled before the session opened")]
    Cancelled,
}

/// A command did not complete successfully.
///
/// Any of these stops the remaining commands of the same host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("exited with status {0}")]
    NonZeroExit(u32),
    #[error("no result after {0:?}")]
    Timeout(Duration),
    #[error("cancelled while running")]
    Cancelled,
}

/// Tearing a session down failed.
///
/// Reported next to the host's results, never instead of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloseError {
    #[error("transport error on close: {0}")]
    Transport(String),
    #[error("close did not finish within {0:?}")]
    Timeout(Duration),
}
