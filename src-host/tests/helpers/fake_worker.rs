use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Port every fake worker announces
pub const FAKE_PORT: u16 = 54231;

/// A shell script standing in for the webrecorder binary.
///
/// Answers `--version` under its own executable name, otherwise echoes its arguments, announces
/// `FAKE_PORT` and stays alive until signalled.
pub struct FakeWorker {
    _dir: TempDir,
    bin: PathBuf,
}

impl FakeWorker {
    pub fn install() -> Self {
        Self::with_port(FAKE_PORT)
    }

    pub fn with_port(port: u16) -> Self {
        let dir = TempDir::new().expect("Failed to create worker dir");
        let bin = dir.path().join("webrecorder_player");
        let script = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"--version\" ]; then\n\
             \techo \"webrecorder_player 9.9.9\"\n\
             \texit 0\n\
             fi\n\
             echo \"args: $*\"\n\
             echo \"stderr noise\" >&2\n\
             echo \"APP_HOST=http://localhost:{port}\"\n\
             exec sleep 30\n"
        );
        write_executable(&bin, &script);
        Self { _dir: dir, bin }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }
}

#[cfg(unix)]
fn write_executable(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, contents).expect("Failed to write worker script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("Failed to mark worker script executable");
}

#[cfg(not(unix))]
fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).expect("Failed to write worker script");
}
