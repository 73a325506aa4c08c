// Worker binary and application directory discovery
// Shared by the host binary and by Config::from_env()

use crate::config::HostMode;
use std::path::{Path, PathBuf};

/// Directory bundled next to the host that holds the worker executables
pub const WORKER_BIN_DIR: &str = "python-binaries";

/// Platform-specific application-data directory (cookie backup, host state)
pub fn app_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| h.join("Library/Application Support/Webrecorder Player"))
    }

    #[cfg(target_os = "windows")]
    {
        dirs::config_dir().map(|d| d.join("Webrecorder Player"))
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|d| d.join("webrecorder-player"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        dirs::home_dir().map(|h| h.join(".webrecorder-player"))
    }
}

/// The user's downloads directory, falling back to ~/Downloads
pub fn downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(std::env::temp_dir)
}

/// File name of the worker executable for a host mode
pub fn worker_exe_name(mode: HostMode) -> String {
    let stem = match mode {
        HostMode::Desktop => "webrecorder",
        HostMode::Player => "webrecorder_player",
    };
    if cfg!(windows) {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}

/// Directories searched for a bundled worker, relative to the host executable.
///
/// Covers the development layout (`target/<profile>/`), an unpacked bundle
/// (`<app>/python-binaries/`) and the macOS `.app` resources directory.
pub fn bundled_worker_dirs(exe_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![exe_dir.join(WORKER_BIN_DIR)];

    if let Some(parent) = exe_dir.parent() {
        dirs.push(parent.join(WORKER_BIN_DIR));

        #[cfg(target_os = "macos")]
        dirs.push(parent.join("Resources").join(WORKER_BIN_DIR));
    }

    dirs
}

/// Resolve the worker executable for `mode`.
///
/// Resolution order:
/// 1) `python-binaries/` next to (or one level above) `current_exe()`
/// 2) `PATH` lookup of the executable name
pub fn resolve_worker_path(mode: HostMode) -> Option<PathBuf> {
    let exe_name = worker_exe_name(mode);

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            for candidate_dir in bundled_worker_dirs(dir) {
                let candidate = candidate_dir.join(&exe_name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    which::which(&exe_name).ok()
}
