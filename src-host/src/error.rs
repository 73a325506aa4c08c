//! Failure types surfaced by the worker host.
//!
//! Spawn failures never escape the supervisor; they are rendered into the
//! diagnostic log with their `Display` text. Join failures end the sync
//! session that raised them. Persistence failures are logged and treated as
//! empty state by the cookie restore/persist paths.

use std::path::PathBuf;
use thiserror::Error;

/// The worker binary is missing or could not be executed.
#[derive(Debug, Error)]
#[error("Error spawning {} binary:\n {source}\n", .bin.display())]
pub struct SpawnError {
    pub bin: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Joining the content swarm for a key failed.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("no swarm backend is available")]
    Unavailable,
    #[error("failed to join swarm for {key}: {message}")]
    Network { key: String, message: String },
}

/// Errors that end a content sync session before it triggers a launch.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid sync key: {0:?}")]
    InvalidKey(String),
    #[error("failed to prepare download directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Join(#[from] JoinError),
}

/// Errors reported by a session partition.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid cookie {name:?}: {reason}")]
    InvalidCookie { name: String, reason: &'static str },
}

/// Reading or writing the persisted cookie store failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read cookie store {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cookie store {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write cookie store {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode cookies: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cookie store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
