// Cancellable single-shot timer for the sync readiness window

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

/// Quiet period after a complete stats update before the launch fires
pub const SYNC_DEBOUNCE: Duration = Duration::from_millis(750);

/// Timer owned by one sync session.
///
/// `fired()` never completes while the timer is unarmed, so it can sit in a
/// `select!` next to the stats feed.
#[derive(Debug)]
pub struct DebounceTimer {
    period: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new(SYNC_DEBOUNCE)
    }
}

impl DebounceTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            sleep: None,
        }
    }

    /// (Re)start the countdown from now
    pub fn arm(&mut self) {
        let deadline = Instant::now() + self.period;
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.sleep = Some(Box::pin(tokio::time::sleep_until(deadline))),
        }
    }

    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Completes once when an armed timer elapses, disarming it
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => std::future::pending().await,
        }
    }
}
