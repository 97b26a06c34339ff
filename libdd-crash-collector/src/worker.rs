// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded worker pool draining the [`crate::queue::SaveQueue`].
//! Grounded on the `Worker` trait in `libdd-common::worker` (an async
//! `run`/`trigger` loop abstraction) but specialised to a "spawn on add,
//! terminate on empty queue" heuristic instead of a fixed wait-on-condvar
//! pool, since that heuristic is what keeps `active_save_workers` meaningful.
//!
//! The `concurrent_saves` bound and the empty-queue exit decision are both
//! enforced inside [`SaveQueue`]'s own lock (`add_and_reserve` /
//! `next_or_release`) rather than via a separate `AtomicUsize` here: two
//! non-atomic steps ("is there capacity?" then "take it") let two concurrent
//! submissions both spawn past the bound, and let a worker's "queue is
//! empty, I'm exiting" race a fresh `add` into stranding the new report with
//! no runner. Routing both decisions through one lock closes both races.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::metrics::SharedMetrics;
use crate::queue::SaveQueue;
use crate::report::CrashReport;
use crate::storage::CrashStorage;

/// Runs at most `concurrent_saves` concurrent save workers against a shared
/// [`SaveQueue`]. A new worker is spawned opportunistically whenever
/// [`WorkerPool::submit`] reserves free capacity.
pub struct WorkerPool {
    queue: Arc<SaveQueue>,
    storage: Arc<dyn CrashStorage>,
    metrics: SharedMetrics,
    concurrent_saves: usize,
    handles: AsyncMutex<JoinSet<()>>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<SaveQueue>,
        storage: Arc<dyn CrashStorage>,
        metrics: SharedMetrics,
        concurrent_saves: usize,
    ) -> Self {
        Self {
            queue,
            storage,
            metrics,
            concurrent_saves: concurrent_saves.max(1),
            handles: AsyncMutex::new(JoinSet::new()),
        }
    }

    /// Number of workers currently draining the queue (the
    /// `active_save_workers` gauge).
    pub fn active_workers(&self) -> usize {
        self.queue.active_workers()
    }

    /// Enqueues `report` and, if the pool has spare capacity, spawns a new
    /// worker to claim it. Capacity is reserved atomically with the push
    ///: a new submission can never exceed `concurrent_saves`,
    /// and a report added just as the last worker decides the queue is empty
    /// is still guaranteed a runner.
    pub async fn submit(self: &Arc<Self>, report: CrashReport) {
        if !self.queue.add_and_reserve(report, self.concurrent_saves) {
            return;
        }

        let this = Arc::clone(self);
        self.handles.lock().await.spawn(async move {
            this.drain_loop().await;
        });
    }

    async fn drain_loop(&self) {
        while let Some(report) = self.queue.next_or_release() {
            if let Err(e) = self.save_to_storage(&report).await {
                warn!(crash_id = %report.crash_id, error = %e, "crash save failed, re-enqueuing");
                self.queue.add(report);
            }
        }
    }

    async fn save_to_storage(&self, report: &CrashReport) -> anyhow::Result<()> {
        let start = std::time::Instant::now();

        self.storage
            .save_dumps(&report.crash_id, &report.dumps)
            .await?;
        self.storage
            .save_raw_crash(&report.crash_id, &report.metadata)
            .await?;

        let elapsed_ms = report
            .metadata
            .get("timestamp")
            .and_then(|v| v.as_float())
            .map(|submitted| {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs_f64();
                ((now - submitted) * 1000.0) as i64
            })
            .unwrap_or_else(|| start.elapsed().as_millis() as i64);

        self.metrics.timing("crash_handling.time", elapsed_ms);
        self.metrics.incr("save_crash.count");
        info!(crash_id = %report.crash_id, "saved");
        Ok(())
    }

    /// Test-only escape hatch: blocks until every spawned worker has
    /// drained the queue and exited. Must never be reachable from the
    /// production request path.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn join_pool(&self) {
        let mut handles = self.handles.lock().await;
        while handles.join_next().await.is_some() {}
    }
}
