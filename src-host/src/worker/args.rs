// Command lines understood by the worker binary

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

/// Port value asking the worker to pick any free port
pub const EPHEMERAL_PORT: &str = "0";

/// Archive cache directory used by player-mode workers (relative to their cwd)
pub const PLAYER_CACHE_DIR: &str = "_warc_cache";

/// Argument list for one worker invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs(Vec<OsString>);

impl WorkerArgs {
    /// Desktop mode: long-lived worker with a user data directory
    pub fn desktop(data_dir: &Path, username: &str) -> Self {
        let mut args = Self::base("info");
        args.push("-d").push(data_dir).push("-u").push(username);
        args.push_port();
        args
    }

    /// Player mode: serve a single archive file
    pub fn player(archive: &Path) -> Self {
        let mut args = Self::player_base();
        args.push(archive);
        args
    }

    /// Player mode: serve a fully-synced collection directory
    pub fn collection(dir: &Path) -> Self {
        let mut args = Self::player_base();
        args.push("--coll-dir").push(dir);
        args
    }

    /// Ask the worker for its version lines
    pub fn version() -> Self {
        Self(vec![OsString::from("--version")])
    }

    /// Arbitrary argument list, for workers that don't follow the standard command line
    pub fn from_raw<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self(args.into_iter().map(|a| a.as_ref().to_os_string()).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &OsStr> {
        self.0.iter().map(OsString::as_os_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn base(loglevel: &str) -> Self {
        let mut args = Self(Vec::new());
        args.push("--no-browser").push("--loglevel").push(loglevel);
        args
    }

    fn player_base() -> Self {
        let mut args = Self::base("error");
        args.push("--cache-dir").push(PLAYER_CACHE_DIR);
        args.push_port();
        args
    }

    fn push_port(&mut self) {
        self.push("--port").push(EPHEMERAL_PORT);
    }

    fn push(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.0.push(arg.as_ref().to_os_string());
        self
    }
}

impl fmt::Display for WorkerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<_> = self.0.iter().map(|a| a.to_string_lossy()).collect();
        write!(f, "{}", rendered.join(" "))
    }
}
