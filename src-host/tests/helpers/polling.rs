use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use wr_desktop_lib::protocol::UiEvent;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive events until `pick` accepts one, failing after `EVENT_TIMEOUT`.
///
/// Events `pick` rejects are returned alongside so tests can check ordering.
pub async fn wait_for_event<F, T>(
    rx: &mut UnboundedReceiver<UiEvent>,
    mut pick: F,
) -> (T, Vec<UiEvent>)
where
    F: FnMut(&UiEvent) -> Option<T>,
{
    let mut skipped = Vec::new();
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;

    loop {
        let event = match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => panic!("event channel closed; saw {:?}", skipped),
            Err(_) => panic!("timed out waiting for event; saw {:?}", skipped),
        };
        match pick(&event) {
            Some(value) => return (value, skipped),
            None => skipped.push(event),
        }
    }
}
