//! Test helpers for the async host code.
//!
//! Only compiled in test builds. Prefer polling a condition with a deadline
//! over sleeping a fixed amount.

use crate::protocol::UiEvent;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// How long `recv_event` waits before failing the test
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `condition` every `interval` until it holds, panicking after `timeout`.
///
/// `desc` names what is being waited for in the panic message.
pub async fn assert_eventually_bool<F, Fut>(
    desc: &str,
    timeout: Duration,
    interval: Duration,
    mut condition: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if condition().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "Timeout waiting for {} after {:?} ({} attempts)",
                desc, timeout, attempts
            );
        }
        tokio::time::sleep(interval).await;
    }
}

/// Next event from a `ChannelSink` receiver, panicking if none arrives in time
pub async fn recv_event(rx: &mut UnboundedReceiver<UiEvent>) -> UiEvent {
    match tokio::time::timeout(EVENT_TIMEOUT, rx.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => panic!("event channel closed"),
        Err(_) => panic!("no event within {:?}", EVENT_TIMEOUT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelSink, EventSink};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_condition_checked_until_true() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);

        assert_eventually_bool(
            "third poll",
            Duration::from_secs(2),
            Duration::from_millis(10),
            move || {
                let counter = Arc::clone(&counter);
                async move { counter.fetch_add(1, Ordering::SeqCst) >= 2 }
            },
        )
        .await;

        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    #[should_panic(expected = "Timeout waiting for never")]
    async fn test_condition_times_out() {
        assert_eventually_bool(
            "never",
            Duration::from_millis(100),
            Duration::from_millis(20),
            || async { false },
        )
        .await;
    }

    #[tokio::test]
    async fn test_recv_event_returns_sent_event() {
        let (sink, mut rx) = ChannelSink::new();
        sink.send(UiEvent::IndexProgress { perct: 7 });
        assert_eq!(recv_event(&mut rx).await, UiEvent::IndexProgress { perct: 7 });
    }
}
