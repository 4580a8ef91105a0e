use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

pub const TICK_PERIOD: std::time::Duration = std::time::Duration::from_secs(1);

/// Repeating task publishing `now - started_at` on every tick.
///
/// The task stops when the handle is cancelled or dropped.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn start(started_at: OffsetDateTime, elapsed: Arc<watch::Sender<Duration>>) -> Self {
        Self::with_period(started_at, elapsed, TICK_PERIOD)
    }

    pub fn with_period(
        started_at: OffsetDateTime,
        elapsed: Arc<watch::Sender<Duration>>,
        period: std::time::Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                elapsed.send_replace(OffsetDateTime::now_utc() - started_at);
            }
        });

        Self { handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
