// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic emitter of queue-depth and pool-utilisation gauges
//!. A long-lived Tokio task standing in for the Python
//! original's `gevent.spawn(self.heartbeat)` cooperative loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::metrics::SharedMetrics;
use crate::queue::SaveQueue;
use crate::worker::WorkerPool;

pub struct Heartbeat {
    queue: Arc<SaveQueue>,
    pool: Arc<WorkerPool>,
    metrics: SharedMetrics,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(
        queue: Arc<SaveQueue>,
        pool: Arc<WorkerPool>,
        metrics: SharedMetrics,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            pool,
            metrics,
            interval,
        }
    }

    /// Runs forever, emitting gauges every `interval`. Any panic-worthy
    /// condition inside a single tick is caught and logged rather than
    /// allowed to end the loop.
    pub async fn run(self) -> ! {
        let this = Arc::new(self);
        let mut ticker = tokio::time::interval(this.interval);
        // The first tick fires immediately; the original sleeps 30s before
        // its first sample, so skip tick zero to match.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let tick_target = Arc::clone(&this);
            // Run each tick on its own task so a panic inside tick() is
            // caught as a JoinError instead of unwinding the heartbeat loop
            // itself -- the async equivalent of the original's
            // `try/except Exception` around a single heartbeat body.
            if let Err(join_error) = tokio::spawn(async move { tick_target.tick() }).await {
                error!(error = %join_error, "exception thrown while retrieving health stats");
            }
        }
    }

    fn tick(&self) {
        self.metrics
            .gauge("save_queue_size", self.queue.len() as i64);
        self.metrics
            .gauge("active_save_workers", self.pool.active_workers() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoopMetrics;
    use crate::storage::NoopCrashStorage;

    #[tokio::test(start_paused = true)]
    async fn emits_gauges_on_each_tick() {
        let queue = Arc::new(SaveQueue::new());
        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&queue),
            Arc::new(NoopCrashStorage),
            Arc::new(NoopMetrics),
            10,
        ));
        let heartbeat = Heartbeat::new(
            Arc::clone(&queue),
            Arc::clone(&pool),
            Arc::new(NoopMetrics),
            Duration::from_secs(30),
        );

        let handle = tokio::spawn(heartbeat.run());
        tokio::time::advance(Duration::from_secs(61)).await;
        handle.abort();
    }
}
