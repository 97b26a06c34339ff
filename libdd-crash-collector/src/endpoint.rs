// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The HTTP handler orchestrating parse -> throttle -> respond -> enqueue
//!. Every accepted POST yields `200 text/plain`, whether the
//! crash was kept, deferred, rejected by the throttler, or couldn't be
//! parsed at all -- the endpoint never signals a 4xx/5xx for content
//! reasons.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use chrono::Utc;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use tracing::{info, warn};

use crate::config::Config;
use crate::id_generator;
use crate::metrics::SharedMetrics;
use crate::payload::PayloadParser;
use crate::queue::SaveQueue;
use crate::report::{CrashReport, MetadataValue};
use crate::throttle::{self, Decision, Throttler};
use crate::worker::WorkerPool;

pub struct SubmissionEndpoint {
    config: Config,
    parser: PayloadParser,
    throttler: Arc<dyn Throttler>,
    pool: Arc<WorkerPool>,
    metrics: SharedMetrics,
}

impl SubmissionEndpoint {
    pub fn new(
        config: Config,
        throttler: Arc<dyn Throttler>,
        pool: Arc<WorkerPool>,
        metrics: SharedMetrics,
    ) -> Self {
        let parser = PayloadParser::new(Arc::clone(&metrics));
        Self {
            config,
            parser,
            throttler,
            pool,
            metrics,
        }
    }

    /// Handles a single `POST` submission. Never returns an HTTP error
    /// response; always `200 text/plain`.
    pub async fn handle(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
        let start = Instant::now();
        let headers = req.headers().clone();

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                Bytes::new()
            }
        };

        let (mut metadata, dumps) = self.parser.parse(&headers, body).await;
        self.metrics.incr("incoming_crash");

        let now = Utc::now();
        metadata.insert(
            "submitted_timestamp".to_string(),
            MetadataValue::Text(now.to_rfc3339()),
        );
        let epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        metadata.insert("timestamp".to_string(), MetadataValue::Float(epoch_secs));

        let (decision, rule_name, _percentage) =
            throttle::decide(self.throttler.as_ref(), &self.metrics, &mut metadata).await;

        let crash_id = match metadata.get("uuid").and_then(|v| v.as_text()) {
            Some(uuid) => {
                info!(crash_id = uuid, "has existing crash_id");
                uuid.to_string()
            }
            None => {
                let generated = id_generator::new_id(now, decision);
                metadata.insert("uuid".to_string(), MetadataValue::Text(generated.clone()));
                generated
            }
        };

        metadata.insert(
            "type_tag".to_string(),
            MetadataValue::Text(self.config.type_tag().to_string()),
        );

        info!(
            crash_id = %crash_id,
            rule_name = %rule_name,
            decision = decision.as_text(),
            "matched by rule",
        );

        let body = match decision {
            Decision::Accept => {
                self.metrics.incr("throttle.accept");
                self.enqueue(metadata, dumps, crash_id.clone()).await;
                format!("CrashID={}{}\n", self.config.dump_id_prefix, crash_id)
            }
            Decision::Defer => {
                self.metrics.incr("throttle.defer");
                self.enqueue(metadata, dumps, crash_id.clone()).await;
                format!("CrashID={}{}\n", self.config.dump_id_prefix, crash_id)
            }
            Decision::Reject => {
                self.metrics.incr("throttle.reject");
                "Discarded=1".to_string()
            }
        };

        self.metrics.timing(
            "BreakpadSubmitterResource.on_post.time",
            start.elapsed().as_millis() as i64,
        );

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(http::header::CONTENT_TYPE, "text/plain")
            .body(Full::new(Bytes::from(body)))
            .expect("building a response from static parts cannot fail");

        Ok(response)
    }

    async fn enqueue(
        &self,
        metadata: crate::report::Metadata,
        dumps: crate::report::Dumps,
        crash_id: String,
    ) {
        self.pool
            .submit(CrashReport::new(metadata, dumps, crash_id))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoopMetrics;
    use crate::throttle::Throttler;

    // `hyper::body::Incoming` can only be produced by a live connection, so
    // `handle()` itself is covered end-to-end in `tests/submission.rs`
    // (a real listener + client). These unit tests cover the parts of the
    // orchestration logic that don't require one.

    struct RejectAllThrottler;

    #[async_trait::async_trait]
    impl Throttler for RejectAllThrottler {
        async fn throttle(&self, _metadata: &crate::report::Metadata) -> (Decision, String, u8) {
            (Decision::Reject, "REJECT_ALL".to_string(), 0)
        }
    }

    #[tokio::test]
    async fn enqueue_adds_to_queue_and_notifies_pool() {
        let queue = Arc::new(SaveQueue::new());
        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&queue),
            Arc::new(crate::storage::NoopCrashStorage),
            Arc::new(NoopMetrics),
            2,
        ));
        let endpoint = SubmissionEndpoint::new(
            Config::default(),
            Arc::new(RejectAllThrottler),
            Arc::clone(&pool),
            Arc::new(NoopMetrics),
        );

        endpoint
            .enqueue(
                crate::report::Metadata::new(),
                crate::report::Dumps::new(),
                "some-id".to_string(),
            )
            .await;

        pool.join_pool().await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn decide_with_reject_all_throttler_yields_reject() {
        let mut metadata = crate::report::Metadata::new();
        let (decision, rule, _rate) =
            throttle::decide(&RejectAllThrottler, &Arc::new(NoopMetrics), &mut metadata).await;
        assert_eq!(decision, Decision::Reject);
        assert_eq!(rule, "REJECT_ALL");
    }
}
