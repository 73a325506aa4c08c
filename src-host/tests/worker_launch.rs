//! Integration test: launch -> port discovery -> proxy bind
//!
//! Uses a shell script in place of the webrecorder binary, so Unix only.
//!
//! Run with: cargo test --test worker_launch

#![cfg(unix)]

mod helpers;

use async_trait::async_trait;
use helpers::fake_worker::{FakeWorker, FAKE_PORT};
use helpers::polling::wait_for_event;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc;
use wr_desktop_lib::error::JoinError;
use wr_desktop_lib::events::ChannelSink;
use wr_desktop_lib::protocol::UiEvent;
use wr_desktop_lib::session::{ProxyRules, RequestHeaders, SessionRegistry, ACCEPT_ENCODING};
use wr_desktop_lib::sync::{NoSwarm, StatsFeed, Swarm, SyncKey, SyncStats};
use wr_desktop_lib::{Config, Host, HostMode, HostSessions};

struct TestHost {
    host: Arc<Host>,
    events: mpsc::UnboundedReceiver<UiEvent>,
    _worker: FakeWorker,
    data: TempDir,
}

fn start_host(mode: HostMode, swarm: Arc<dyn Swarm>) -> TestHost {
    let worker = FakeWorker::install();
    let data = TempDir::new().unwrap();

    let mut config = Config::with_dirs(mode, data.path(), data.path().join("state"));
    config.worker_bin = worker.bin().to_path_buf();
    config.ensure_dirs().unwrap();

    let registry = SessionRegistry::new();
    let sessions = HostSessions::from_registry(&registry, &config.partition);
    let (sink, events) = ChannelSink::new();

    TestHost {
        host: Arc::new(Host::new(config, sessions, swarm, Arc::new(sink))),
        events,
        _worker: worker,
        data,
    }
}

#[tokio::test]
async fn desktop_worker_binds_proxy_before_ready_event() {
    let mut t = start_host(HostMode::Desktop, Arc::new(NoSwarm));

    let binding = t
        .host
        .start_desktop()
        .await
        .unwrap()
        .expect("desktop worker never became reachable");
    assert_eq!(binding.port, FAKE_PORT);
    assert_eq!(binding.partition, "persist:wr");

    let (port, _) = wait_for_event(&mut t.events, |e| match e {
        UiEvent::WorkerReady { port, .. } => Some(*port),
        _ => None,
    })
    .await;
    assert_eq!(port, FAKE_PORT);

    let app = &t.host.sessions().app;
    assert_eq!(app.proxy_rules().await, Some(ProxyRules::localhost(FAKE_PORT)));
    let sent = app.rewrite_request_headers(RequestHeaders::new()).await;
    assert_eq!(sent.get("Accept-Encoding").map(String::as_str), Some(ACCEPT_ENCODING));

    let status = t.host.status();
    assert_eq!(status.config.host.as_deref(), Some("http://localhost:54231/"));
    assert!(status.stdout.contains("-d "));
    assert!(status.stdout.contains("--port 0"));

    t.host.shutdown().await;
    assert_eq!(t.host.supervisor().discovered_port(), None);
}

#[tokio::test]
async fn player_archive_open_emits_events_in_order() {
    let mut t = start_host(HostMode::Player, Arc::new(NoSwarm));
    let archive = t.data.path().join("site.warc.gz");

    let binding = t
        .host
        .open_archive(&archive)
        .expect("player mode opens archives")
        .await
        .unwrap()
        .expect("player worker never became reachable");
    assert_eq!(binding.port, FAKE_PORT);

    let ((host, source), before) = wait_for_event(&mut t.events, |e| match e {
        UiEvent::Indexing { host, source } => Some((host.clone(), source.clone())),
        _ => None,
    })
    .await;
    assert_eq!(host, "http://localhost:54231/");
    assert_eq!(source, Some(archive.display().to_string()));
    assert_eq!(
        before,
        vec![
            UiEvent::ChangeLocation { path: "/".into() },
            UiEvent::Initializing { src: "warc".into() },
        ]
    );

    let stdout = t.host.status().stdout;
    assert!(stdout.contains("--cache-dir _warc_cache"));
    assert!(stdout.contains(&archive.display().to_string()));

    t.host.supervisor().terminate();
}

#[tokio::test]
async fn queued_file_open_runs_when_ui_is_ready() {
    let mut t = start_host(HostMode::Player, Arc::new(NoSwarm));
    let archive = t.data.path().join("queued.warc");

    assert!(t.host.open_file(archive.clone()).is_none());
    assert!(!t.host.supervisor().is_running());

    let handle = t
        .host
        .ui_ready(&["wr-desktop".to_string(), "/ignored.warc".to_string()])
        .expect("queued file should open");
    assert!(handle.await.unwrap().is_some());

    let (source, _) = wait_for_event(&mut t.events, |e| match e {
        UiEvent::Indexing { source, .. } => source.clone(),
        _ => None,
    })
    .await;
    assert_eq!(source, archive.display().to_string());

    t.host.supervisor().terminate();
}

#[tokio::test]
async fn version_reports_worker_under_product_name() {
    let t = start_host(HostMode::Player, Arc::new(NoSwarm));

    let version = t.host.refresh_version().await;
    let lines: Vec<_> = version.lines().collect();
    assert_eq!(lines[0], "webrecorder 9.9.9");
    assert!(lines[1].starts_with("wr-desktop "));
}

/// Swarm that reports the content complete straight away
struct InstantSwarm {
    joined: Mutex<Vec<String>>,
}

impl InstantSwarm {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            joined: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Swarm for InstantSwarm {
    async fn join(&self, key: &SyncKey, dir: &Path) -> Result<StatsFeed, JoinError> {
        self.joined
            .lock()
            .unwrap()
            .push(dir.display().to_string());
        let (tx, rx) = mpsc::channel(4);
        tracing::debug!(%key, "instant swarm joined");
        tokio::spawn(async move {
            let _ = tx.send(SyncStats::new(512, 1024)).await;
            let _ = tx.send(SyncStats::new(1024, 1024)).await;
            // Feed stays open briefly, like a swarm still connected to peers
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        });
        Ok(rx)
    }
}

#[tokio::test]
async fn synced_content_launches_collection_worker() {
    let swarm = InstantSwarm::new();
    let mut t = start_host(HostMode::Player, swarm.clone());

    let binding = t
        .host
        .sync("dat://feedbeef")
        .await
        .unwrap()
        .expect("synced content never served");
    assert_eq!(binding.port, FAKE_PORT);

    let expected_dir = t.host.config().sync_dir.join("feedbeef");
    assert_eq!(
        swarm.joined.lock().unwrap().clone(),
        vec![expected_dir.display().to_string()]
    );

    let (source, before) = wait_for_event(&mut t.events, |e| match e {
        UiEvent::Indexing { source, .. } => source.clone(),
        _ => None,
    })
    .await;
    assert_eq!(source, "feedbeef");
    assert_eq!(
        before,
        vec![
            UiEvent::Initializing { src: "dat".into() },
            UiEvent::IndexProgress { perct: 50 },
            UiEvent::IndexProgress { perct: 100 },
        ]
    );

    let stdout = t.host.status().stdout;
    assert!(stdout.contains(&format!("--coll-dir {}", expected_dir.display())));

    t.host.supervisor().terminate();
}

#[tokio::test]
async fn desktop_sync_replaces_running_worker() {
    let swarm = InstantSwarm::new();
    let mut t = start_host(HostMode::Desktop, swarm.clone());

    t.host
        .start_desktop()
        .await
        .unwrap()
        .expect("desktop worker never became reachable");
    let desktop_pid = t.host.supervisor().worker_pid();
    assert!(desktop_pid.is_some());

    let binding = t
        .host
        .sync("dat://cafe")
        .await
        .unwrap()
        .expect("desktop-mode sync never served");
    assert_eq!(binding.port, FAKE_PORT);
    assert_ne!(t.host.supervisor().worker_pid(), desktop_pid);

    let (source, before) = wait_for_event(&mut t.events, |e| match e {
        UiEvent::Indexing { source, .. } => source.clone(),
        _ => None,
    })
    .await;
    assert_eq!(source, "cafe");
    assert!(!before
        .iter()
        .any(|e| matches!(e, UiEvent::SyncFailed { .. })));

    let expected_dir = t.host.config().sync_dir.join("cafe");
    let stdout = t.host.status().stdout;
    assert!(stdout.contains(&format!("--coll-dir {}", expected_dir.display())));
    assert!(!stdout.contains("-d "));

    t.host.supervisor().terminate();
}
