// Cookie backup file handling with locking and atomic writes

use super::cookies::{merge_cookies, CookieRecord};
use super::partition::SessionPartition;
use crate::error::PersistenceError;
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// The persisted cookie store (`cookie-backup.json`)
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store. `Ok(None)` when no backup has been written yet.
    pub fn load(&self) -> Result<Option<Vec<CookieRecord>>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Read the store, treating an absent or unreadable file as empty
    pub fn load_or_empty(&self) -> Vec<CookieRecord> {
        match self.load() {
            Ok(Some(cookies)) => cookies,
            Ok(None) => {
                tracing::info!("No cookie backup found.");
                Vec::new()
            }
            Err(e) => {
                tracing::info!(error = %e, "Ignoring unreadable cookie backup");
                Vec::new()
            }
        }
    }

    /// Replace the store contents with exclusive file locking
    pub fn save(&self, cookies: &[CookieRecord]) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        // Serialize writers from concurrent host instances; released on drop
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(write_err)?;
        lock.lock_exclusive().map_err(write_err)?;

        let contents = serde_json::to_string_pretty(cookies)?;
        atomic_write(&self.path, &contents).map_err(write_err)?;

        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

/// Write `contents` to a sibling temp file, then rename over `path`
pub fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid path: {}", path.display()),
        )
    })?;

    // Same directory keeps the rename on one filesystem
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
        std::process::id()
    ));

    fs::write(&temp_path, contents)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

/// Outcome of applying the persisted store to a partition
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Merge the partition's live cookies into the store and write it out.
///
/// Returns the number of records written.
pub async fn persist_session_cookies(
    session: &dyn SessionPartition,
    store: &CookieStore,
) -> Result<usize, PersistenceError> {
    let live = session.cookies().await?;
    let store = store.clone();

    tokio::task::spawn_blocking(move || {
        let merged = merge_cookies(live, store.load_or_empty());
        store.save(&merged)?;
        tracing::info!(count = merged.len(), path = %store.path().display(), "cookies saved");
        Ok::<_, PersistenceError>(merged.len())
    })
    .await?
}

/// Apply each persisted record to the partition.
///
/// A missing or unreadable store is skipped; a record the partition rejects
/// is skipped without affecting the rest.
pub async fn restore_session_cookies(
    session: &dyn SessionPartition,
    store: &CookieStore,
) -> RestoreReport {
    let reader = store.clone();
    let loaded = match tokio::task::spawn_blocking(move || reader.load()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::warn!(error = %e, "cookie restore task failed");
            return RestoreReport::default();
        }
    };

    let cookies = match loaded {
        Ok(Some(cookies)) => cookies,
        Ok(None) => {
            tracing::info!("No cookie backup found.");
            return RestoreReport::default();
        }
        Err(e) => {
            tracing::info!(error = %e, "No cookie backup found.");
            return RestoreReport::default();
        }
    };

    let mut report = RestoreReport::default();
    for cookie in cookies {
        let name = cookie.name.clone();
        match session.set_cookie(cookie).await {
            Ok(()) => report.applied += 1,
            Err(e) => {
                tracing::debug!(cookie = %name, error = %e, "skipping cookie");
                report.skipped += 1;
            }
        }
    }

    tracing::info!(
        applied = report.applied,
        skipped = report.skipped,
        "Cookie backup loaded."
    );
    report
}
