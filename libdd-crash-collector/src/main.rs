// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use libdd_crash_collector::config::Config;
use libdd_crash_collector::endpoint::SubmissionEndpoint;
use libdd_crash_collector::heartbeat::Heartbeat;
use libdd_crash_collector::metrics::{NoopMetrics, SharedMetrics};
use libdd_crash_collector::queue::SaveQueue;
use libdd_crash_collector::server;
use libdd_crash_collector::storage::{CrashStorage, NoopCrashStorage};
use libdd_crash_collector::throttle::{AcceptAllThrottler, Throttler};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    for (key, value) in config.describe() {
        info!(%key, %value, "effective configuration");
    }

    // Wire in the no-op storage and accept-all throttler by default; real
    // deployments construct a real CrashStorage / Throttler and pass them in
    // here instead.
    let metrics: SharedMetrics = Arc::new(NoopMetrics);
    let storage: Arc<dyn CrashStorage> = Arc::new(NoopCrashStorage);
    let throttler: Arc<dyn Throttler> = Arc::new(AcceptAllThrottler);

    let queue = Arc::new(SaveQueue::new());
    let pool = Arc::new(libdd_crash_collector::worker::WorkerPool::new(
        Arc::clone(&queue),
        Arc::clone(&storage),
        Arc::clone(&metrics),
        config.concurrent_saves,
    ));

    let heartbeat = Heartbeat::new(
        Arc::clone(&queue),
        Arc::clone(&pool),
        Arc::clone(&metrics),
        config.heartbeat_interval,
    );
    tokio::spawn(heartbeat.run());

    let endpoint = Arc::new(SubmissionEndpoint::new(
        config.clone(),
        throttler,
        pool,
        metrics,
    ));

    server::serve(config.bind_address, endpoint, storage).await?;
    Ok(())
}
