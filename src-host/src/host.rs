//! The worker host: coordinates the supervisor, the proxy binder, content
//! sync and cookie persistence behind the commands the presentation layer
//! sends.
//!
//! Every launch path ends the same way: the supervisor resolves the run's
//! [`PortWatch`](crate::worker::PortWatch), the app partition is bound to the
//! discovered port, and only then is the presentation layer told the worker
//! is reachable.

use crate::config::{Config, HostMode};
use crate::error::PersistenceError;
use crate::events::EventSink;
use crate::protocol::{HostConfigSnapshot, StatusSnapshot, UiEvent, SOURCE_WARC};
use crate::session::{
    self, CookieStore, ProxyBinding, RestoreReport, SessionPartition, SessionRegistry,
};
use crate::sync::{SyncKey, SyncOutcome, SyncSession, Swarm};
use crate::worker::{LaunchRequest, Supervisor, WorkerArgs};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Argument prefix macOS adds when launching from Finder
const PSN_ARG_PREFIX: &str = "-psn";

/// Name the worker's version output is reported under
const PRODUCT_NAME: &str = "webrecorder";

/// Archive passed on the command line: exactly one positional argument
pub fn startup_archive(argv: &[String]) -> Option<PathBuf> {
    match argv {
        [_, arg] if !arg.starts_with(PSN_ARG_PREFIX) => Some(PathBuf::from(arg)),
        _ => None,
    }
}

/// The partitions the host touches
#[derive(Clone)]
pub struct HostSessions {
    /// Partition the app's web content runs in; bound to the worker's proxy
    pub app: Arc<dyn SessionPartition>,
    /// Partition whose cookies persist across restarts
    pub default: Arc<dyn SessionPartition>,
}

impl HostSessions {
    pub fn from_registry(registry: &SessionRegistry, partition: &str) -> Self {
        Self {
            app: registry.from_partition(partition),
            default: registry.default_session(),
        }
    }
}

/// What to announce once the worker is bound
#[derive(Debug, Clone, Copy)]
enum Readiness {
    /// Desktop worker: `worker-ready`
    WorkerReady,
    /// Player worker: `indexing`
    Indexing,
}

/// File-open events that arrive before the UI can handle them
#[derive(Debug, Default)]
struct FileOpenQueue {
    ready: bool,
    pending: Option<PathBuf>,
}

impl FileOpenQueue {
    /// Returns the path back if it can be opened now
    fn offer(&mut self, path: PathBuf) -> Option<PathBuf> {
        if self.ready {
            Some(path)
        } else {
            // Only the latest request survives
            self.pending = Some(path);
            None
        }
    }

    /// First call returns `Some(pending)`; later calls return `None`
    fn mark_ready(&mut self) -> Option<Option<PathBuf>> {
        if self.ready {
            return None;
        }
        self.ready = true;
        Some(self.pending.take())
    }
}

pub struct Host {
    config: Config,
    supervisor: Supervisor,
    sessions: HostSessions,
    cookie_store: CookieStore,
    swarm: Arc<dyn Swarm>,
    sink: Arc<dyn EventSink>,
    version: StdMutex<String>,
    binding: StdMutex<Option<ProxyBinding>>,
    file_queue: StdMutex<FileOpenQueue>,
    /// Serializes proxy binds so a slow bind can't land after a newer one
    bind_lock: Mutex<()>,
}

impl Host {
    pub fn new(
        config: Config,
        sessions: HostSessions,
        swarm: Arc<dyn Swarm>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let supervisor = Supervisor::new(&config.worker_bin);
        Self::with_supervisor(config, supervisor, sessions, swarm, sink)
    }

    pub fn with_supervisor(
        config: Config,
        supervisor: Supervisor,
        sessions: HostSessions,
        swarm: Arc<dyn Swarm>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let cookie_store = CookieStore::new(config.cookie_store());
        Self {
            config,
            supervisor,
            sessions,
            cookie_store,
            swarm,
            sink,
            version: StdMutex::new(String::new()),
            binding: StdMutex::new(None),
            file_queue: StdMutex::new(FileOpenQueue::default()),
            bind_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn sessions(&self) -> &HostSessions {
        &self.sessions
    }

    /// Proxy binding currently applied to the app partition
    pub fn binding(&self) -> Option<ProxyBinding> {
        lock(&self.binding).clone()
    }

    /// Launch the long-lived desktop worker.
    ///
    /// Resolves with the proxy binding once the worker is reachable.
    pub fn start_desktop(self: &Arc<Self>) -> JoinHandle<Option<ProxyBinding>> {
        let args = WorkerArgs::desktop(&self.config.data_dir, &self.config.username);
        self.launch_and_bind(LaunchRequest::new(args, None), Readiness::WorkerReady)
    }

    /// Replace the player worker with one serving `path`.
    ///
    /// No-op in desktop mode, where the single worker is never replaced.
    pub fn open_archive(self: &Arc<Self>, path: &Path) -> Option<JoinHandle<Option<ProxyBinding>>> {
        if self.config.mode == HostMode::Desktop {
            tracing::debug!(path = %path.display(), "ignoring archive open in desktop mode");
            return None;
        }

        tracing::info!(path = %path.display(), "opening archive");
        self.sink.send(UiEvent::ChangeLocation {
            path: "/".to_string(),
        });
        self.sink.send(UiEvent::Initializing {
            src: SOURCE_WARC.to_string(),
        });

        let source = path.display().to_string();
        let request = LaunchRequest::new(WorkerArgs::player(path), Some(source));
        Some(self.launch_and_bind(request, Readiness::Indexing))
    }

    /// OS file-open event: open now, or hold it until the UI is ready
    pub fn open_file(self: &Arc<Self>, path: PathBuf) -> Option<JoinHandle<Option<ProxyBinding>>> {
        let now = lock(&self.file_queue).offer(path)?;
        self.open_archive(&now)
    }

    /// The presentation layer can receive events.
    ///
    /// Opens the queued file-open request, or failing that the archive named
    /// on the command line. Only the first call has any effect.
    pub fn ui_ready(self: &Arc<Self>, argv: &[String]) -> Option<JoinHandle<Option<ProxyBinding>>> {
        let pending = lock(&self.file_queue).mark_ready()?;
        let path = pending.or_else(|| startup_archive(argv))?;
        self.open_archive(&path)
    }

    /// Acquire the content for `raw_key`, then serve it with a player worker.
    ///
    /// Works in either mode: the collection launch replaces whatever worker
    /// is running. Failures are reported with a `sync-failed` event, keyed by
    /// the key without its `dat://` scheme, and in the diagnostic log.
    pub fn sync(self: &Arc<Self>, raw_key: &str) -> JoinHandle<Option<ProxyBinding>> {
        let host = Arc::clone(self);
        let raw_key = raw_key.to_string();

        tokio::spawn(async move {
            let key = match SyncKey::parse(&raw_key) {
                Ok(key) => key,
                Err(e) => {
                    host.sync_failed(SyncKey::strip_scheme(&raw_key), &e);
                    return None;
                }
            };

            let session = SyncSession::new(key.clone(), &host.config.sync_dir);
            match session.run(host.swarm.as_ref(), host.sink.as_ref()).await {
                Ok(SyncOutcome::Ready(dir)) => {
                    let request =
                        LaunchRequest::new(WorkerArgs::collection(&dir), Some(key.to_string()));
                    host.launch_and_bind(request, Readiness::Indexing)
                        .await
                        .ok()
                        .flatten()
                }
                Ok(SyncOutcome::Abandoned) => None,
                Err(e) => {
                    host.sync_failed(key.as_str(), &e);
                    None
                }
            }
        })
    }

    /// Diagnostic log plus the `{host, version}` snapshot
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            config: HostConfigSnapshot {
                host: self
                    .supervisor
                    .discovered_port()
                    .map(|port| format!("http://localhost:{}/", port)),
                version: lock(&self.version).clone(),
            },
            stdout: self.supervisor.diagnostics(),
        }
    }

    pub fn publish_status(&self) {
        self.sink.send(UiEvent::Status(self.status()));
    }

    /// Ask the worker binary for its version and cache it for status queries
    pub async fn refresh_version(&self) -> String {
        let host_line = format!("wr-desktop {}", env!("CARGO_PKG_VERSION"));
        let version = match self.supervisor.query_version().await {
            Ok(worker) if !worker.is_empty() => format!(
                "{}\n{}",
                brand_version(&worker, self.supervisor.binary()),
                host_line
            ),
            Ok(_) => host_line,
            Err(e) => {
                tracing::warn!("{}", e);
                host_line
            }
        };

        *lock(&self.version) = version.clone();
        version
    }

    /// Apply the persisted cookie store to the default partition
    pub async fn restore_cookies(&self) -> RestoreReport {
        session::restore_session_cookies(self.sessions.default.as_ref(), &self.cookie_store).await
    }

    /// Merge the default partition's cookies into the persisted store
    pub async fn persist_cookies(&self) -> Result<usize, PersistenceError> {
        session::persist_session_cookies(self.sessions.default.as_ref(), &self.cookie_store).await
    }

    /// Persist cookies and interrupt the worker
    pub async fn shutdown(&self) {
        if let Err(e) = self.persist_cookies().await {
            tracing::warn!(error = %e, "failed to save cookies");
        }
        self.supervisor.shutdown();
    }

    fn launch_and_bind(
        self: &Arc<Self>,
        request: LaunchRequest,
        readiness: Readiness,
    ) -> JoinHandle<Option<ProxyBinding>> {
        let watch = self.supervisor.launch(request);
        let host = Arc::clone(self);

        tokio::spawn(async move {
            let ready = watch.ready().await?;

            let _guard = host.bind_lock.lock().await;
            if host.supervisor.discovered_port() != Some(ready.port) {
                tracing::debug!(port = ready.port, "worker replaced before proxy bind");
                return None;
            }

            let binding = match session::bind(host.sessions.app.as_ref(), ready.port).await {
                Ok(binding) => binding,
                Err(e) => {
                    tracing::warn!(error = %e, "proxy bind failed");
                    host.supervisor.note(format!("proxy bind failed: {}", e));
                    return None;
                }
            };
            *lock(&host.binding) = Some(binding.clone());

            let event = match readiness {
                Readiness::WorkerReady => UiEvent::WorkerReady {
                    host: ready.base_url,
                    port: ready.port,
                },
                Readiness::Indexing => UiEvent::Indexing {
                    host: ready.base_url,
                    source: ready.source,
                },
            };
            host.sink.send(event);

            Some(binding)
        })
    }

    fn sync_failed(&self, key: &str, reason: &dyn std::fmt::Display) {
        let message = reason.to_string();
        tracing::warn!(key, %message, "content sync failed");
        self.supervisor
            .note(format!("sync failed for {}: {}", key, message));
        self.sink.send(UiEvent::SyncFailed {
            key: key.to_string(),
            message,
        });
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("mode", &self.config.mode)
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

/// Show the worker's version output under the product name instead of its executable's
fn brand_version(output: &str, bin: &Path) -> String {
    match bin.file_stem().and_then(|stem| stem.to_str()) {
        Some(exe) if !exe.is_empty() && exe != PRODUCT_NAME => output.replace(exe, PRODUCT_NAME),
        _ => output.to_string(),
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
