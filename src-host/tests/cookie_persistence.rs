//! Integration test: cookies survive a host restart
//!
//! Run with: cargo test --test cookie_persistence

use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use wr_desktop_lib::events::ChannelSink;
use wr_desktop_lib::session::{CookieRecord, SessionRegistry};
use wr_desktop_lib::sync::NoSwarm;
use wr_desktop_lib::{Config, Host, HostMode, HostSessions};

fn host_in(dir: &TempDir) -> Host {
    let config = Config::with_dirs(HostMode::Player, dir.path(), dir.path().join("state"));
    let registry = SessionRegistry::new();
    let sessions = HostSessions::from_registry(&registry, &config.partition);
    let (sink, _rx) = ChannelSink::new();
    Host::new(config, sessions, Arc::new(NoSwarm), Arc::new(sink))
}

#[tokio::test]
async fn cookies_round_trip_through_backup_file() {
    let dir = TempDir::new().unwrap();

    // First run: nothing to restore, one cookie set during the session
    let first = host_in(&dir);
    let report = first.restore_cookies().await;
    assert_eq!(report.applied, 0);

    let mut sid = CookieRecord::new("sid", ".example.com", "/", "abc");
    sid.expiration_date = Some(1_900_000_000.0);
    sid.extra.insert("httpOnly".into(), Value::Bool(true));
    first.sessions().default.set_cookie(sid.clone()).await.unwrap();
    first.shutdown().await;

    let backup = first.config().cookie_store();
    let on_disk: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&backup).unwrap()).unwrap();
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0]["expirationDate"], Value::from(1_900_000_000.0));

    // Second run: restored cookie is live, a new one is added
    let second = host_in(&dir);
    assert_eq!(second.restore_cookies().await.applied, 1);
    assert_eq!(second.sessions().default.cookies().await.unwrap(), vec![sid]);

    second
        .sessions()
        .default
        .set_cookie(CookieRecord::new("theme", ".example.com", "/", "dark"))
        .await
        .unwrap();
    second.shutdown().await;

    // Third run sees both, each once
    let third = host_in(&dir);
    assert_eq!(third.restore_cookies().await.applied, 2);
}

#[tokio::test]
async fn corrupt_backup_is_replaced_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);
    let backup = host.config().cookie_store();
    std::fs::create_dir_all(backup.parent().unwrap()).unwrap();
    std::fs::write(&backup, "not json").unwrap();

    assert_eq!(host.restore_cookies().await.applied, 0);

    host.sessions()
        .default
        .set_cookie(CookieRecord::new("a", ".example.com", "/", "1"))
        .await
        .unwrap();
    host.persist_cookies().await.unwrap();

    let saved: Vec<CookieRecord> =
        serde_json::from_str(&std::fs::read_to_string(&backup).unwrap()).unwrap();
    assert_eq!(saved.len(), 1);
}
