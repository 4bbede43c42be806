use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::tui::AppEvent;

/// Repeating timer that posts [`AppEvent::RevealTick`] at a fixed period.
///
/// At most one timer runs at a time; starting again replaces the previous
/// task, and dropping the timer cancels it.
pub struct RevealTimer {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl RevealTimer {
    pub fn new(period: Duration) -> Self {
        Self { period, handle: None }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn start(&mut self, tx: mpsc::UnboundedSender<AppEvent>) {
        self.cancel();

        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            // First tick one full period from now, not immediately
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(AppEvent::RevealTick).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RevealTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
