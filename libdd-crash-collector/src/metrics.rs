// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metrics sink abstraction. Modeled on `dogstatsd-client::Flusher`: a thin
//! trait so the submission pipeline stays decoupled from the transport, plus
//! a `cadence`-backed DogStatsD implementation for production use and a
//! no-op implementation for tests.
//!
//! Metric names used by the core are a contractual surface --
//! do not rename them.

use cadence::prelude::*;
use cadence::{StatsdClient, UdpMetricSink};
use std::net::UdpSocket;
use std::sync::Arc;
use tracing::error;

/// Counter, gauge, histogram and timing primitives keyed by metric name
///").
pub trait MetricsSink: Send + Sync {
    fn incr(&self, name: &str);
    fn gauge(&self, name: &str, value: i64);
    fn histogram(&self, name: &str, value: i64);
    fn timing(&self, name: &str, millis: i64);
}

/// Discards every metric. Used in tests and as a safe default when no
/// DogStatsD endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _name: &str) {}
    fn gauge(&self, _name: &str, _value: i64) {}
    fn histogram(&self, _name: &str, _value: i64) {}
    fn timing(&self, _name: &str, _millis: i64) {}
}

/// Sends metrics to a DogStatsD endpoint over UDP via `cadence`.
pub struct DogStatsDMetrics {
    client: StatsdClient,
}

impl DogStatsDMetrics {
    pub fn new(host: &str, prefix: &str) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let sink = UdpMetricSink::from(host, socket)?;
        let client = StatsdClient::from_sink(prefix, sink);
        Ok(Self { client })
    }
}

impl MetricsSink for DogStatsDMetrics {
    fn incr(&self, name: &str) {
        if let Err(e) = self.client.incr(name) {
            error!(metric = name, error = %e, "failed to send counter");
        }
    }

    fn gauge(&self, name: &str, value: i64) {
        if let Err(e) = self.client.gauge(name, value as u64) {
            error!(metric = name, error = %e, "failed to send gauge");
        }
    }

    fn histogram(&self, name: &str, value: i64) {
        if let Err(e) = self.client.histogram(name, value as u64) {
            error!(metric = name, error = %e, "failed to send histogram");
        }
    }

    fn timing(&self, name: &str, millis: i64) {
        if let Err(e) = self.client.time_duration(
            name,
            std::time::Duration::from_millis(millis.max(0) as u64),
        ) {
            error!(metric = name, error = %e, "failed to send timer");
        }
    }
}

pub type SharedMetrics = Arc<dyn MetricsSink>;
