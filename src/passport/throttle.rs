use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Spaces successive callers at least `min_interval` apart.
///
/// Uses tokio's clock, so a paused test runtime drives it deterministically.
#[derive(Debug)]
pub struct IntervalGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl IntervalGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn wait(&self) {
        let mut guard = self.last.lock().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                debug!(wait_ms = remaining.as_millis() as u64, "throttling external lookup");
                sleep(remaining).await;
            }
        }
        *guard = Some(Instant::now());
    }
}
