// Worker process supervisor
//
// Owns the single live worker process and the state of its current run:
// - Spawning the worker with piped stdout/stderr
// - Feeding output into the diagnostic log and the port scanner
// - Resolving the run's PortWatch exactly once when the port is announced
// - Terminating the previous worker before every relaunch
// - Watching for the worker's exit without tying the host's lifetime to it

use super::args::WorkerArgs;
use super::diagnostics::DiagnosticLog;
use super::scanner::{PortScanner, Scan};
use super::termination::{self, TerminationReason, TerminationStrategy};
use crate::error::SpawnError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

/// Size of each read from the worker's output pipes
const READ_CHUNK_SIZE: usize = 4096;

/// Windows `DETACHED_PROCESS` creation flag
#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

/// Arguments for one worker run plus the request that caused it
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub args: WorkerArgs,
    /// Identifies the originating request (archive path, sync key); echoed back in PortReady
    pub source: Option<String>,
}

impl LaunchRequest {
    pub fn new(args: WorkerArgs, source: Option<String>) -> Self {
        Self { args, source }
    }
}

/// The worker of the current run is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReady {
    pub port: u16,
    /// `http://localhost:<port>/`
    pub base_url: String,
    pub source: Option<String>,
}

impl PortReady {
    pub fn new(port: u16, source: Option<String>) -> Self {
        Self {
            port,
            base_url: format!("http://localhost:{}/", port),
            source,
        }
    }
}

/// Completion handle for one run's port discovery.
///
/// Resolves to `None` if the run is superseded, terminated, fails to spawn,
/// or its output closes without an announcement.
#[derive(Debug)]
pub struct PortWatch {
    rx: oneshot::Receiver<PortReady>,
}

impl PortWatch {
    pub async fn ready(self) -> Option<PortReady> {
        self.rx.await.ok()
    }
}

/// The live worker process.
///
/// Only the pid is held here. The child handle belongs to a detached task
/// that reaps it, so the host never waits on the worker and a worker that
/// dies on its own is cleared from the run before its pid can be reused.
#[derive(Debug)]
struct WorkerProcess {
    pid: Option<u32>,
}

/// Everything that belongs to the current run; reset together at launch
#[derive(Debug, Default)]
struct SupervisorState {
    run_id: u64,
    process: Option<WorkerProcess>,
    port: Option<u16>,
    log: DiagnosticLog,
    on_port: Option<oneshot::Sender<PortReady>>,
    source: Option<String>,
}

struct Inner {
    bin: PathBuf,
    termination: Box<dyn TerminationStrategy>,
    state: StdMutex<SupervisorState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Terminate the live worker (if any) and invalidate the current run
    fn stop(&self, state: &mut SupervisorState, reason: TerminationReason) {
        state.run_id += 1;
        state.port = None;
        state.on_port = None;

        let Some(process) = state.process.take() else {
            return;
        };
        tracing::info!(pid = ?process.pid, ?reason, "terminating worker");
        if let Some(pid) = process.pid {
            self.termination.terminate(pid, reason);
        }
    }

    /// Apply one scan result to the run it came from
    fn record(&self, run_id: u64, scan: Scan) {
        let mut state = self.lock();
        if state.run_id != run_id {
            return;
        }

        for line in scan.lines {
            tracing::debug!(target: "worker", "{}", line);
            state.log.push(line);
        }

        let Some(port) = scan.port else {
            return;
        };
        // A worker that already exited is not listening anymore
        let Some(pid) = state.process.as_ref().map(|p| p.pid) else {
            return;
        };
        if state.port.is_some() {
            return;
        }
        state.port = Some(port);

        let ready = PortReady::new(port, state.source.clone());
        tracing::info!("worker is listening on: {} (pid {:?})", ready.base_url, pid);

        if let Some(tx) = state.on_port.take() {
            let _ = tx.send(ready);
        }
    }

    fn record_exit(&self, run_id: u64, status: std::io::Result<std::process::ExitStatus>) {
        let mut state = self.lock();
        if state.run_id != run_id {
            return;
        }
        match status {
            Ok(status) => tracing::info!(%status, "worker exited"),
            Err(e) => tracing::warn!(error = %e, "failed to wait for worker"),
        }
        state.process = None;
        state.port = None;
    }

    /// stdout closed: the run can no longer announce a port
    fn close_port_watch(&self, run_id: u64) {
        let mut state = self.lock();
        if state.run_id == run_id {
            state.on_port = None;
        }
    }
}

/// Supervisor for the single backend worker.
///
/// Cloning is cheap; clones share the same worker and run state.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Supervisor using the host platform's termination strategy
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self::with_strategy(bin, termination::for_host())
    }

    pub fn with_strategy(bin: impl Into<PathBuf>, termination: Box<dyn TerminationStrategy>) -> Self {
        Self {
            inner: Arc::new(Inner {
                bin: bin.into(),
                termination,
                state: StdMutex::new(SupervisorState::default()),
            }),
        }
    }

    /// Worker executable this supervisor launches
    pub fn binary(&self) -> &Path {
        &self.inner.bin
    }

    /// Replace the running worker with a new one.
    ///
    /// Terminates the previous worker, resets the discovered port and the
    /// diagnostic log, then spawns the worker and starts streaming its
    /// output. Must be called from within a tokio runtime. Spawn failures are
    /// written to the diagnostic log and resolve the returned watch to `None`.
    pub fn launch(&self, request: LaunchRequest) -> PortWatch {
        let (tx, rx) = oneshot::channel();
        let inner = &self.inner;
        let mut state = inner.lock();

        inner.stop(&mut state, TerminationReason::Relaunch);
        state.log.clear();
        let run_id = state.run_id;
        state.source = request.source.clone();

        tracing::info!(bin = %inner.bin.display(), args = %request.args, "launching worker");

        let mut cmd = Command::new(&inner.bin);
        cmd.args(request.args.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group so terminal signals aimed at the host don't reach the worker
        #[cfg(unix)]
        cmd.process_group(0);

        #[cfg(windows)]
        cmd.creation_flags(DETACHED_PROCESS);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = SpawnError {
                    bin: inner.bin.clone(),
                    source,
                };
                tracing::warn!("{}", err);
                state.log.push(err.to_string());
                return PortWatch { rx };
            }
        };

        state.on_port = Some(tx);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_output(
                Arc::clone(inner),
                run_id,
                stdout,
                PortScanner::stdout(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_output(
                Arc::clone(inner),
                run_id,
                stderr,
                PortScanner::stderr(),
            ));
        }

        state.process = Some(WorkerProcess { pid: child.id() });
        tokio::spawn(watch_exit(Arc::clone(inner), run_id, child));

        PortWatch { rx }
    }

    /// Signal the live worker to stop and unset the discovered port.
    ///
    /// Does not wait for the process to exit.
    pub fn terminate(&self) {
        let mut state = self.inner.lock();
        self.inner.stop(&mut state, TerminationReason::Requested);
    }

    /// Host-exit variant of [`terminate`](Self::terminate) (SIGINT on Unix)
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        self.inner.stop(&mut state, TerminationReason::HostExit);
    }

    /// Port announced by the current run, if any
    pub fn discovered_port(&self) -> Option<u16> {
        self.inner.lock().port
    }

    pub fn worker_pid(&self) -> Option<u32> {
        self.inner.lock().process.as_ref().and_then(|p| p.pid)
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().process.is_some()
    }

    /// Diagnostic log of the current run, newline-joined
    pub fn diagnostics(&self) -> String {
        self.inner.lock().log.joined()
    }

    pub fn diagnostic_lines(&self) -> Vec<String> {
        self.inner.lock().log.lines().map(str::to_string).collect()
    }

    /// Append a host-side note to the current run's diagnostic log
    pub fn note(&self, line: impl Into<String>) {
        self.inner.lock().log.push(line);
    }

    /// Run `<bin> --version` and return its stdout
    pub async fn query_version(&self) -> Result<String, SpawnError> {
        let output = Command::new(&self.inner.bin)
            .args(WorkerArgs::version().iter())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SpawnError {
                bin: self.inner.bin.clone(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("bin", &self.inner.bin)
            .field("termination", &self.inner.termination)
            .finish()
    }
}

/// Stream one output pipe into the run's log and scanner until it closes
async fn pump_output<R>(inner: Arc<Inner>, run_id: u64, mut reader: R, mut scanner: PortScanner)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => inner.record(run_id, scanner.feed(&buf[..n])),
            Err(e) => {
                tracing::debug!(error = %e, "worker output read failed");
                break;
            }
        }
    }
    inner.record(run_id, scanner.finish());
    if scanner.detects_port() {
        inner.close_port_watch(run_id);
    }
}

async fn watch_exit(inner: Arc<Inner>, run_id: u64, mut child: Child) {
    let status = child.wait().await;
    inner.record_exit(run_id, status);
}
