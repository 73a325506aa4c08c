//! Content-addressed acquisition in front of the worker.
//!
//! A sync session joins the swarm for a key, reports download progress, and
//! once the content is fully materialized (and stays that way for the
//! debounce window) hands the local directory to the supervisor.

pub mod debounce;
pub mod pipeline;

use crate::error::{JoinError, SyncError};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub use debounce::{DebounceTimer, SYNC_DEBOUNCE};
pub use pipeline::{SyncOutcome, SyncSession};

/// Scheme prefix accepted (and ignored) on acquisition keys
pub const KEY_SCHEME: &str = "dat://";

/// One statistics update from the swarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStats {
    pub downloaded: u64,
    pub total: u64,
}

impl SyncStats {
    pub fn new(downloaded: u64, total: u64) -> Self {
        Self { downloaded, total }
    }

    /// Whole-number progress in `[0, 100]`; 0 while the total is unknown
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let ratio = self.downloaded as f64 / self.total as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.downloaded == self.total
    }
}

/// Validated acquisition key, without its scheme prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncKey(String);

impl SyncKey {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let key = Self::strip_scheme(raw);
        if key.is_empty() || key.contains(['/', '\\']) || key == ".." || key == "." {
            return Err(SyncError::InvalidKey(raw.to_string()));
        }
        Ok(Self(key.to_string()))
    }

    /// The key as reported back to the UI: trimmed, without `dat://` or a trailing `/`
    pub fn strip_scheme(raw: &str) -> &str {
        let key = raw.trim();
        let key = key.strip_prefix(KEY_SCHEME).unwrap_or(key);
        key.trim_end_matches('/')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Download directory for this key under `base`
    pub fn dir_in(&self, base: &Path) -> PathBuf {
        base.join(&self.0)
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of one sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Requested,
    Joining,
    Syncing,
    ReadyDebounce,
    Triggered,
    Aborted,
}

/// Statistics stream for a joined key; closes when the swarm stops reporting
pub type StatsFeed = mpsc::Receiver<SyncStats>;

/// Network backend that downloads content for a key into a directory
#[async_trait]
pub trait Swarm: Send + Sync {
    async fn join(&self, key: &SyncKey, dir: &Path) -> Result<StatsFeed, JoinError>;
}

/// Backend used when no swarm implementation is linked in
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSwarm;

#[async_trait]
impl Swarm for NoSwarm {
    async fn join(&self, _key: &SyncKey, _dir: &Path) -> Result<StatsFeed, JoinError> {
        Err(JoinError::Unavailable)
    }
}
