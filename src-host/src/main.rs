// wr-desktop: worker host process
//
// Responsibilities:
// - Restore persisted cookies into the default session
// - Launch the desktop worker (desktop mode) and bind the session proxy to it
// - Read HostCommands as JSON lines from stdin
// - Write UiEvents as JSON lines to stdout
// - Save cookies and interrupt the worker on quit, EOF or Ctrl-C

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use wr_desktop_lib::{
    events::StdoutSink,
    logging,
    protocol::{deserialize_message, HostCommand},
    session::SessionRegistry,
    sync::NoSwarm,
    Config, Host, HostMode, HostSessions,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env();
    config
        .ensure_dirs()
        .context("Failed to create host directories")?;

    tracing::info!(
        mode = %config.mode,
        worker = %config.worker_bin.display(),
        "starting wr-desktop"
    );

    let registry = SessionRegistry::new();
    let sessions = HostSessions::from_registry(&registry, &config.partition);
    let host = Arc::new(Host::new(
        config,
        sessions,
        Arc::new(NoSwarm),
        Arc::new(StdoutSink),
    ));

    host.restore_cookies().await;
    host.refresh_version().await;

    if host.config().mode == HostMode::Desktop {
        let _ = host.start_desktop();
    }

    // Shutdown signal channel
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        let _ = signal::ctrl_c().await;
        let _ = shutdown_tx.send(()).await;
    });

    let argv: Vec<String> = std::env::args().collect();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line.context("Failed to read command")? {
                    Some(line) => line,
                    None => {
                        tracing::info!("stdin closed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match deserialize_message::<HostCommand>(line.as_bytes()) {
                    Ok(HostCommand::Quit) => break,
                    Ok(cmd) => handle_command(&host, cmd, &argv),
                    Err(e) => tracing::warn!(error = %e, "ignoring malformed command"),
                }
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    host.shutdown().await;
    Ok(())
}

fn handle_command(host: &Arc<Host>, cmd: HostCommand, argv: &[String]) {
    tracing::debug!(?cmd, "command");
    match cmd {
        HostCommand::OpenFile { path } => {
            host.open_file(PathBuf::from(path));
        }
        HostCommand::OpenArchive { path } => {
            host.open_archive(&PathBuf::from(path));
        }
        HostCommand::UiReady => {
            host.ui_ready(argv);
        }
        HostCommand::Sync { key } => {
            host.sync(&key);
        }
        HostCommand::Status => host.publish_status(),
        HostCommand::Quit => {}
    }
}
