// Presentation event transport

use crate::protocol::{serialize_message, UiEvent};
use std::io::Write;
use tokio::sync::mpsc;

/// One-way, fire-and-forget delivery of UiEvents
pub trait EventSink: Send + Sync {
    fn send(&self, event: UiEvent);
}

/// JSON lines on the process's stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn send(&self, event: UiEvent) {
        let bytes = match serialize_message(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode event");
                return;
            }
        };

        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(&bytes).and_then(|_| stdout.flush()) {
            tracing::debug!(error = %e, "event dropped, stdout closed");
        }
    }
}

/// In-process sink backed by an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn send(&self, event: UiEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event);
    }
}
