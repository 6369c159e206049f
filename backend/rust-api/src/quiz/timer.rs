use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Periodic ticker backing the "TIME:" readout of a live session.
///
/// Only counts ticks; scoring uses the session's own instants. The task is
/// aborted when the timer is cancelled or dropped.
#[derive(Debug)]
pub struct DisplayTimer {
    ticks: Arc<AtomicU64>,
    tick: Duration,
    handle: JoinHandle<()>,
}

impl DisplayTimer {
    pub fn spawn(tick: Duration) -> Self {
        let tick = tick.max(Duration::from_millis(1));
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick resolves immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        Self {
            ticks,
            tick,
            handle,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn display_seconds(&self) -> u64 {
        let elapsed_ms = self.ticks() as u128 * self.tick.as_millis();
        (elapsed_ms / 1000) as u64
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for DisplayTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
