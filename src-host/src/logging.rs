// Logging setup for the host binary
// stdout carries the presentation event stream, so all log output goes to stderr

use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Honors `WR_LOG`, then `RUST_LOG`, defaulting to `info`. Raw worker output
/// is logged at `debug` under the `worker` target, so `WR_LOG=worker=debug`
/// mirrors the worker's console. Safe to call more than once.
pub fn init() {
    LOGGING_INIT.call_once(|| {
        let directives = std::env::var("WR_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        let filter = tracing_subscriber::EnvFilter::try_new(&directives)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_env_filter(filter)
            .try_init();
    });
}
