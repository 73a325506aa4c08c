// Per-key sync session: join, track progress, debounce readiness

use super::debounce::DebounceTimer;
use super::{SyncKey, SyncState, SyncStats, Swarm};
use crate::error::SyncError;
use crate::events::EventSink;
use crate::protocol::{UiEvent, SOURCE_DAT};
use std::path::{Path, PathBuf};

/// How a sync session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Content is fully materialized in this directory; launch the worker on it
    Ready(PathBuf),
    /// The swarm stopped reporting before the content was complete
    Abandoned,
}

/// One acquisition: key, target directory, last stats and its own debounce timer
#[derive(Debug)]
pub struct SyncSession {
    key: SyncKey,
    dir: PathBuf,
    state: SyncState,
    last: SyncStats,
    timer: DebounceTimer,
}

impl SyncSession {
    /// Session downloading `key` into `<base>/<key>`
    pub fn new(key: SyncKey, base: &Path) -> Self {
        let dir = key.dir_in(base);
        Self {
            key,
            dir,
            state: SyncState::Requested,
            last: SyncStats::default(),
            timer: DebounceTimer::default(),
        }
    }

    pub fn key(&self) -> &SyncKey {
        &self.key
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Most recent statistics update
    pub fn last_stats(&self) -> SyncStats {
        self.last
    }

    /// Apply one statistics update and return the progress to report.
    ///
    /// Any pending readiness timer is cancelled; a complete update starts it again.
    pub fn on_stats(&mut self, stats: SyncStats) -> u8 {
        self.timer.cancel();
        self.last = stats;

        if stats.is_complete() {
            self.timer.arm();
            self.state = SyncState::ReadyDebounce;
        } else {
            self.state = SyncState::Syncing;
        }

        stats.percent()
    }

    /// Drive the session to completion.
    ///
    /// Join failures abort the session and are returned to the caller. A
    /// pending readiness timer still fires after the stats feed closes.
    pub async fn run(
        mut self,
        swarm: &dyn Swarm,
        sink: &dyn EventSink,
    ) -> Result<SyncOutcome, SyncError> {
        if let Some(base) = self.dir.parent() {
            tokio::fs::create_dir_all(base)
                .await
                .map_err(|source| SyncError::Directory {
                    path: base.to_path_buf(),
                    source,
                })?;
        }

        self.state = SyncState::Joining;
        tracing::info!(key = %self.key, dir = %self.dir.display(), "joining swarm");

        let mut feed = match swarm.join(&self.key, &self.dir).await {
            Ok(feed) => feed,
            Err(e) => {
                self.state = SyncState::Aborted;
                tracing::warn!(key = %self.key, error = %e, "swarm join failed");
                return Err(e.into());
            }
        };

        self.state = SyncState::Syncing;
        sink.send(UiEvent::Initializing {
            src: SOURCE_DAT.to_string(),
        });

        let mut feed_open = true;
        loop {
            tokio::select! {
                stats = feed.recv(), if feed_open => match stats {
                    Some(stats) => {
                        let perct = self.on_stats(stats);
                        tracing::debug!(key = %self.key, downloaded = stats.downloaded, total = stats.total, "sync progress");
                        sink.send(UiEvent::IndexProgress { perct });
                    }
                    None => {
                        feed_open = false;
                        if !self.timer.is_armed() {
                            tracing::info!(key = %self.key, "swarm feed closed before content was complete");
                            return Ok(SyncOutcome::Abandoned);
                        }
                    }
                },
                _ = self.timer.fired() => {
                    self.state = SyncState::Triggered;
                    tracing::info!(key = %self.key, "content synced");
                    return Ok(SyncOutcome::Ready(self.dir));
                }
            }
        }
    }
}
