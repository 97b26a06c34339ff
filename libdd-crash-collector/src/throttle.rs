// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Throttle-result adapter. Wraps a pluggable external
//! [`Throttler`] with the "already throttled" / "Throttleable=0" fast paths
//! the Python original hard-codes ahead of delegating to its rule engine.

use async_trait::async_trait;

use crate::metrics::SharedMetrics;
use crate::report::Metadata;

/// Three-way crash disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Defer,
    Reject,
}

impl Decision {
    /// `legacy_processing` integer encoding:
    /// 0 = ACCEPT, 1 = DEFER. REJECT is never persisted into metadata
    /// because rejected reports are never enqueued.
    pub fn legacy_processing(self) -> i64 {
        match self {
            Decision::Accept => 0,
            Decision::Defer => 1,
            Decision::Reject => 2,
        }
    }

    pub fn from_legacy_processing(value: i64) -> Option<Self> {
        match value {
            0 => Some(Decision::Accept),
            1 => Some(Decision::Defer),
            _ => None,
        }
    }

    pub fn as_text(self) -> &'static str {
        match self {
            Decision::Accept => "ACCEPT",
            Decision::Defer => "DEFER",
            Decision::Reject => "REJECT",
        }
    }
}

/// External rule engine. Implementations decide ACCEPT /
/// DEFER / REJECT for a crash's metadata, returning the rule that fired and
/// the percentage of matching crashes that are kept.
#[async_trait]
pub trait Throttler: Send + Sync {
    async fn throttle(&self, metadata: &Metadata) -> (Decision, String, u8);
}

/// A throttler that accepts everything under a fixed rule name. Useful as a
/// default / test double; production deployments plug in a real rule
/// engine.
pub struct AcceptAllThrottler;

#[async_trait]
impl Throttler for AcceptAllThrottler {
    async fn throttle(&self, _metadata: &Metadata) -> (Decision, String, u8) {
        (Decision::Accept, "ACCEPT_ALL".to_string(), 100)
    }
}

/// Runs the full throttle decision procedure and writes `legacy_processing`
/// / `throttle_rate` back into `metadata`.
pub async fn decide(
    throttler: &dyn Throttler,
    metrics: &SharedMetrics,
    metadata: &mut Metadata,
) -> (Decision, String, u8) {
    if metadata.contains_key("legacy_processing") && metadata.contains_key("throttle_rate") {
        let parsed = metadata
            .get("legacy_processing")
            .and_then(|v| v.as_int())
            .zip(metadata.get("throttle_rate").and_then(|v| v.as_int()))
            .and_then(|(legacy, rate)| {
                let decision = Decision::from_legacy_processing(legacy)?;
                (0..=100).contains(&rate).then_some((decision, rate as u8))
            });

        match parsed {
            Some((decision, rate)) => {
                write_back(metadata, decision, rate);
                return (decision, "ALREADY_THROTTLED".to_string(), rate);
            }
            None => metrics.incr("throttle.bad_throttle_values"),
        }
    }

    if metadata
        .get("Throttleable")
        .and_then(|v| v.as_text())
        .map(|v| v == "0")
        .unwrap_or(false)
    {
        metrics.incr("throttleable_0");
        write_back(metadata, Decision::Accept, 100);
        return (Decision::Accept, "THROTTLEABLE_0".to_string(), 100);
    }

    let (decision, rule_name, rate) = throttler.throttle(metadata).await;
    write_back(metadata, decision, rate);
    (decision, rule_name, rate)
}

fn write_back(metadata: &mut Metadata, decision: Decision, rate: u8) {
    metadata.insert(
        "legacy_processing".to_string(),
        decision.legacy_processing().into(),
    );
    metadata.insert("throttle_rate".to_string(), (rate as i64).into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoopMetrics;
    use std::sync::Arc;

    fn metrics() -> SharedMetrics {
        Arc::new(NoopMetrics)
    }

    #[tokio::test]
    async fn throttleable_0_always_accepts() {
        let mut md = Metadata::new();
        md.insert("Throttleable".to_string(), "0".to_string().into());
        md.insert("ProductName".to_string(), "Firefox".to_string().into());

        let (decision, rule, rate) =
            decide(&AcceptAllThrottler, &metrics(), &mut md).await;
        assert_eq!(decision, Decision::Accept);
        assert_eq!(rule, "THROTTLEABLE_0");
        assert_eq!(rate, 100);
        assert_eq!(md.get("legacy_processing").unwrap().as_int(), Some(0));
        assert_eq!(md.get("throttle_rate").unwrap().as_int(), Some(100));
    }

    #[tokio::test]
    async fn already_throttled_reuses_values() {
        let mut md = Metadata::new();
        md.insert("legacy_processing".to_string(), 1i64.into());
        md.insert("throttle_rate".to_string(), 42i64.into());

        let (decision, rule, rate) =
            decide(&AcceptAllThrottler, &metrics(), &mut md).await;
        assert_eq!(decision, Decision::Defer);
        assert_eq!(rule, "ALREADY_THROTTLED");
        assert_eq!(rate, 42);
    }

    #[tokio::test]
    async fn bad_throttle_values_fall_through() {
        let mut md = Metadata::new();
        md.insert("legacy_processing".to_string(), 9i64.into());
        md.insert("throttle_rate".to_string(), 42i64.into());

        let (decision, rule, _rate) =
            decide(&AcceptAllThrottler, &metrics(), &mut md).await;
        assert_eq!(decision, Decision::Accept);
        assert_eq!(rule, "ACCEPT_ALL");
    }

    #[tokio::test]
    async fn unparseable_throttle_values_bump_bad_metric_and_fall_through() {
        let metrics = Arc::new(crate::metrics::tests::RecordingMetrics::default());
        let mut md = Metadata::new();
        md.insert("legacy_processing".to_string(), "abc".to_string().into());
        md.insert("throttle_rate".to_string(), 50i64.into());

        let (decision, rule, _rate) = decide(
            &AcceptAllThrottler,
            &(Arc::clone(&metrics) as SharedMetrics),
            &mut md,
        )
        .await;
        assert_eq!(decision, Decision::Accept);
        assert_eq!(rule, "ACCEPT_ALL");
        assert!(metrics
            .events
            .lock()
            .unwrap()
            .contains(&"incr:throttle.bad_throttle_values".to_string()));
    }

    #[tokio::test]
    async fn delegates_to_throttler_by_default() {
        let mut md = Metadata::new();
        let (decision, rule, rate) =
            decide(&AcceptAllThrottler, &metrics(), &mut md).await;
        assert_eq!(decision, Decision::Accept);
        assert_eq!(rule, "ACCEPT_ALL");
        assert_eq!(rate, 100);
    }
}
