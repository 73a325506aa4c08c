// Environment configuration for the worker host
// Resolves the worker binary, the directories it reads/writes, and the session partition

use crate::paths;
use std::path::{Path, PathBuf};

/// Session partition the app's web content (and proxy binding) lives in
pub const DEFAULT_PARTITION: &str = "persist:wr";

/// File name of the persisted cookie store inside the state directory
pub const COOKIE_STORE_FILE: &str = "cookie-backup.json";

/// Which worker the host runs, and how it reacts to archive open requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Full desktop app: one long-lived worker launched at startup
    Desktop,
    /// Archive player: a worker per opened archive or synced collection
    Player,
}

impl std::fmt::Display for HostMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostMode::Desktop => write!(f, "desktop"),
            HostMode::Player => write!(f, "player"),
        }
    }
}

impl std::str::FromStr for HostMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(HostMode::Desktop),
            "player" => Ok(HostMode::Player),
            other => Err(format!("Unknown host mode: {}", other)),
        }
    }
}

/// Configuration for worker paths and session settings
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: HostMode,
    /// Worker executable
    pub worker_bin: PathBuf,
    /// Desktop-mode data directory passed to the worker with `-d`
    pub data_dir: PathBuf,
    /// Base directory for content synced from the swarm
    pub sync_dir: PathBuf,
    /// Host state (cookie backup)
    pub state_dir: PathBuf,
    /// Session partition bound to the worker's proxy
    pub partition: String,
    /// User identity passed to the worker with `-u`
    pub username: String,
}

impl Config {
    /// Create configuration using default paths
    pub fn default_paths(mode: HostMode) -> Self {
        let downloads = paths::downloads_dir();
        let state_dir = paths::app_data_dir().unwrap_or_else(|| downloads.join(".webrecorder"));
        Self::with_dirs(mode, &downloads, state_dir)
    }

    /// Configuration rooted at explicit directories, with the worker resolved for `mode`
    pub fn with_dirs(mode: HostMode, downloads: &Path, state_dir: PathBuf) -> Self {
        let worker_bin = paths::resolve_worker_path(mode)
            .unwrap_or_else(|| PathBuf::from(paths::worker_exe_name(mode)));

        Self {
            mode,
            worker_bin,
            data_dir: downloads.join("Webrecorder"),
            sync_dir: downloads.join("webrecorder-dat"),
            state_dir,
            partition: DEFAULT_PARTITION.to_string(),
            username: Self::current_username(),
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    ///
    /// - `WR_MODE`: `desktop` (default) or `player`
    /// - `WR_DOWNLOADS_DIR`: replaces the downloads directory
    /// - `WR_DESKTOP_DIR`: replaces the state directory
    /// - `WR_WORKER_BIN`: explicit worker executable
    pub fn from_env() -> Self {
        let mode = match std::env::var("WR_MODE") {
            Ok(raw) => raw.parse::<HostMode>().unwrap_or_else(|e| {
                tracing::warn!("{}; using desktop mode", e);
                HostMode::Desktop
            }),
            Err(_) => HostMode::Desktop,
        };

        let mut config = match std::env::var("WR_DOWNLOADS_DIR") {
            Ok(dir) => {
                let downloads = PathBuf::from(dir);
                let state_dir = paths::app_data_dir().unwrap_or_else(|| downloads.join(".webrecorder"));
                Self::with_dirs(mode, &downloads, state_dir)
            }
            Err(_) => Self::default_paths(mode),
        };

        if let Ok(dir) = std::env::var("WR_DESKTOP_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Ok(bin) = std::env::var("WR_WORKER_BIN") {
            config.worker_bin = PathBuf::from(bin);
        }

        config
    }

    /// Path of the persisted cookie store
    pub fn cookie_store(&self) -> PathBuf {
        self.state_dir.join(COOKIE_STORE_FILE)
    }

    /// Ensure the state and sync directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        std::fs::create_dir_all(&self.sync_dir)?;
        Ok(())
    }

    fn current_username() -> String {
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "user".to_string())
    }
}
