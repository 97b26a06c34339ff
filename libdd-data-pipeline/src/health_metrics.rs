// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Trace Exporter Health Metrics
//!
//! This module defines all health metrics emitted by the libdatadog trace exporter. These metrics
//! are sent to DogStatsD to provide visibility for Datadog support.
//!
//! ## Overview
//!
//! Health metrics help monitor the trace exporter's behavior, including successful operations,
//! error conditions, and performance characteristics. They are emitted via DogStatsD and follow
//! consistent naming conventions.
//!
//! **Note**: Health metrics are **disabled by default**. They must be explicitly enabled using
//! `TraceExporterBuilder::enable_health_metrics()` or the FFI function
//! `ddog_trace_exporter_config_enable_health_metrics(config, true)`.
//!
//! ## Metric Types
//!
//! - **Count**: Incremental counters that track the number of occurrences
//! - **Distribution**: Value distributions that track sizes, durations, or quantities
//!
//! ## Naming Convention
//!
//! The metrics follow a hierarchical naming pattern:
//!
//! - `datadog.tracer.exporter.*`: All trace exporter metrics
//!   - `datadog.tracer.exporter.deserialize.*`: Trace deserialization metrics
//!   - `datadog.tracer.exporter.serialize.*`: Trace serialization metrics
//!   - `datadog.tracer.exporter.transport.*`: Network transport metrics
//!     - `datadog.tracer.exporter.transport.traces.*`: Trace-specific transport metrics
//!       - `datadog.tracer.exporter.transport.traces.sent`: All trace send attempts
//!       - `datadog.tracer.exporter.transport.traces.successful`: Successful trace sends
//!       - `datadog.tracer.exporter.transport.traces.failed`: Failed trace sends
//!       - `datadog.tracer.exporter.transport.traces.dropped`: Dropped traces due to errors
//!
//! ## Error Handling Patterns
//!
//! ### HTTP Status Code Handling
//!
//! - **Success (2xx)**: Emit `transport.traces.successful`, `transport.sent.bytes`,
//!   `transport.traces.sent`
//! - **Client Errors (4xx)**: Emit `transport.traces.failed`, `transport.sent.bytes`,
//!   `transport.traces.sent`, and conditionally `transport.dropped.bytes`,
//!   `transport.traces.dropped`
//! - **Server Errors (5xx)**: Emit `transport.traces.failed`, `transport.sent.bytes`,
//!   `transport.traces.sent`, `transport.dropped.bytes`, `transport.traces.dropped`
//! - **Network Errors**: Emit `transport.traces.failed`, `transport.sent.bytes`,
//!   `transport.traces.sent`, `transport.dropped.bytes`, `transport.traces.dropped`
//!
//! ### Special Status Code Exclusions
//!
//! The following HTTP status codes do NOT trigger `transport.dropped.bytes` or
//! `transport.traces.dropped` emission:
//! - **404 Not Found**: Indicates endpoint not available (agent configuration issue)
//! - **415 Unsupported Media Type**: Indicates format negotiation issue
//!
//! These exclusions prevent false alarms for configuration issues rather than actual payload drops.
//!
//! ## Tags
//!
//! All metrics include the following standard tags:
//! - `libdatadog_version`: Version of the libdatadog library
//!
//! Additional conditional tags:
//! - `type:<status_code>`: HTTP status code for error metrics (e.g., `type:400`, `type:404`,
//!   `type:500`)
//! - `type:<error_type>`: Error type classification for non-HTTP errors (e.g., `type:network`,
//!   `type:timeout`, `type:response_body`, `type:build`, `type:unknown`)

use std::borrow::Cow;

// =============================================================================
// Trace Processing Metrics
// =============================================================================

/// Number of trace chunks successfully deserialized from input.
///
/// **Type**: Count  
/// **When Emitted**: After successful deserialization of trace data from msgpack format  
/// **Tags**: `libdatadog_version`
pub(crate) const DESERIALIZE_TRACES: &str = "datadog.tracer.exporter.deserialize.traces";

/// Number of trace deserialization errors.
///
/// **Type**: Count  
/// **When Emitted**: When msgpack deserialization fails due to invalid format or corrupted data  
/// **Tags**: `libdatadog_version`
pub(crate) const DESERIALIZE_TRACES_ERRORS: &str = "datadog.tracer.exporter.deserialize.errors";

/// Number of trace serialization errors.
///
/// **Type**: Count  
/// **When Emitted**: When msgpack serialization fails  
/// **Tags**: `libdatadog_version`
pub(crate) const SERIALIZE_TRACES_ERRORS: &str = "datadog.tracer.exporter.serialize.errors";

// =============================================================================
// Transport - Trace Metrics
// =============================================================================

/// Number of trace chunks included in HTTP requests to the agent (all attempts).
///
/// **Type**: Distribution  
/// **When Emitted**: Always emitted for every send attempt, regardless of success or failure  
/// **Tags**: `libdatadog_version`
pub(crate) const TRANSPORT_TRACES_SENT: &str = "datadog.tracer.exporter.transport.traces.sent";

/// Number of trace chunks successfully sent to the agent.
///
/// **Type**: Count  
/// **When Emitted**: After successful HTTP response from the agent (2xx status codes)  
/// **Tags**: `libdatadog_version`
pub(crate) const TRANSPORT_TRACES_SUCCESSFUL: &str =
    "datadog.tracer.exporter.transport.traces.successful";

/// Number of errors encountered while sending traces to the agent.
///
/// **Type**: Count  
/// **When Emitted**:
/// - HTTP error responses (4xx, 5xx status codes)
/// - Network/connection errors
/// - Request timeout errors
///
/// **Tags**: `libdatadog_version`, `type:<status_code>` (for HTTP errors), `type:<error_type>` (for
/// other errors)
///
/// **Error Types**:
/// - `type:<status_code>`: HTTP status codes (e.g., `type:400`, `type:404`, `type:500`)
/// - `type:network`: Network/connection errors
/// - `type:timeout`: Request timeout errors
/// - `type:response_body`: Response body read errors
/// - `type:build`: Request build errors
/// - `type:unknown`: Fallback for unrecognized error types
pub(crate) const TRANSPORT_TRACES_FAILED: &str = "datadog.tracer.exporter.transport.traces.failed";

/// Number of trace chunks dropped due to errors.
///
/// **Type**: Distribution  
/// **When Emitted**:
/// - HTTP error responses (excluding 404 Not Found and 415 Unsupported Media Type)
/// - Network/connection errors
/// - Request timeout errors
///
/// **Tags**: `libdatadog_version`
///
/// **Note**: 404 and 415 status codes are excluded as they represent endpoint/format issues rather
/// than dropped payloads. While they aren't counted as dropped traces, they may still be dropped.
pub(crate) const TRANSPORT_TRACES_DROPPED: &str =
    "datadog.tracer.exporter.transport.traces.dropped";

// =============================================================================
// Transport - Payload Metrics
// =============================================================================

/// Size in bytes of HTTP payloads sent to the agent.
///
/// **Type**: Distribution  
/// **When Emitted**: Always emitted for every send attempt, regardless of success or failure  
/// **Tags**: `libdatadog_version`
pub(crate) const TRANSPORT_SENT_BYTES: &str = "datadog.tracer.exporter.transport.sent.bytes";

/// Size in bytes of HTTP payloads dropped due to errors.
///
/// **Type**: Distribution  
/// **When Emitted**:
/// - HTTP error responses (excluding 404 Not Found and 415 Unsupported Media Type)
/// - Network/connection errors
/// - Request timeout errors
///
/// **Tags**: `libdatadog_version`
///
/// **Note**: 404 and 415 status codes are excluded as they represent endpoint/format issues rather
/// than dropped payloads
pub(crate) const TRANSPORT_DROPPED_BYTES: &str = "datadog.tracer.exporter.transport.dropped.bytes";

/// Number of HTTP requests made to the agent.
///
/// **Type**: Distribution  
/// **When Emitted**: Always emitted after each send operation, counting all HTTP attempts including
/// retries **Tags**: `libdatadog_version`
///
/// **Note**: Value represents total request attempts (1 for success without retries, >1 when
/// retries occur)
pub(crate) const TRANSPORT_REQUESTS: &str = "datadog.tracer.exporter.transport.requests";

#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub(crate) enum HealthMetric {
    Count(&'static str, i64),
    Distribution(&'static str, i64),
}

/// Categorization of errors from different sources (direct hyper responses vs
/// send_with_retry results) for consistent metric emission
#[derive(Debug, Clone, Copy)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub(crate) enum TransportErrorType {
    /// HTTP error with a specific status code (4xx, 5xx)
    Http(u16),
    /// Network/connection error
    Network,
    /// Request timeout
    Timeout,
    /// Failed to read response body
    ResponseBody,
    /// Failed to build the HTTP request
    Build,
}

impl TransportErrorType {
    pub(crate) fn as_tag_value(&self) -> Cow<'static, str> {
        match self {
            TransportErrorType::Http(code) => Cow::Owned(code.to_string()),
            TransportErrorType::Network => Cow::Borrowed("network"),
            TransportErrorType::Timeout => Cow::Borrowed("timeout"),
            TransportErrorType::ResponseBody => Cow::Borrowed("response_body"),
            TransportErrorType::Build => Cow::Borrowed("build"),
        }
    }

    /// Per the health metrics specification:
    /// - 404 and 415 status codes do NOT emit dropped metrics
    /// - All other HTTP errors and non-HTTP errors emit dropped metrics
    pub(crate) fn should_emit_dropped_metrics(&self) -> bool {
        !matches!(
            self,
            TransportErrorType::Http(404) | TransportErrorType::Http(415)
        )
    }
}

/// Result structure for health metrics emission
///
/// This structure captures all the information needed to emit the appropriate
/// health metric for a send operation regardless whence it came
#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq))]
pub(crate) struct SendResult {
    /// The error type if the operation failed, or `None` if it succeeded.
    pub error_type: Option<TransportErrorType>,
    /// Size of the payload in bytes
    pub payload_bytes: usize,
    /// Number of trace chunks in the payload
    pub trace_chunks: usize,
    /// Number of HTTP request attempts (including retries)
    pub request_attempts: u32,
}

impl SendResult {
    /// Create a new successful send result
    pub(crate) fn success(
        payload_bytes: usize,
        trace_chunks: usize,
        request_attempts: u32,
    ) -> Self {
        debug_assert!(
            request_attempts > 0,
            "SendResult::success called with zero request attempts"
        );
        Self {
            error_type: None,
            payload_bytes,
            trace_chunks,
            request_attempts,
        }
    }

    /// Create a new failed send result
    pub(crate) fn failure(
        error_type: TransportErrorType,
        payload_bytes: usize,
        trace_chunks: usize,
        request_attempts: u32,
    ) -> Self {
        debug_assert!(
            request_attempts > 0,
            "SendResult::failure called with zero request attempts"
        );
        Self {
            error_type: Some(error_type),
            payload_bytes,
            trace_chunks,
            request_attempts,
        }
    }

    /// Returns whether the send operation was successful
    #[cfg(test)]
    pub(crate) fn is_success(&self) -> bool {
        self.error_type.is_none()
    }

    /// Collect all health metrics that should be emitted for this result
    ///
    /// This method encapsulates all the logic for determining which metrics to
    /// emit based on the send operation. It returns a vector of metrics that
    /// should be sent to DogStatsD
    ///
    /// # Returns
    ///
    /// A vector of `(HealthMetric, Option<String>)` tuples where:
    /// - The first element is the metric to emit
    /// - The second element is an optional tag value for error classification
    pub(crate) fn collect_metrics(&self) -> Vec<(HealthMetric, Option<String>)> {
        // Max capacity: 3 base + 1 outcome + 2 dropped
        let mut metrics = Vec::with_capacity(6);

        // Always emit: sent bytes, sent traces, request count
        metrics.push((
            HealthMetric::Distribution(TRANSPORT_SENT_BYTES, self.payload_bytes as i64),
            None,
        ));
        metrics.push((
            HealthMetric::Distribution(TRANSPORT_TRACES_SENT, self.trace_chunks as i64),
            None,
        ));
        metrics.push((
            HealthMetric::Distribution(TRANSPORT_REQUESTS, self.request_attempts as i64),
            None,
        ));

        match &self.error_type {
            None => {
                // Emit successful traces count
                metrics.push((
                    HealthMetric::Count(TRANSPORT_TRACES_SUCCESSFUL, self.trace_chunks as i64),
                    None,
                ));
            }
            Some(error_type) => {
                // Emit failed metric with type tag
                metrics.push((
                    HealthMetric::Count(TRANSPORT_TRACES_FAILED, 1),
                    Some(error_type.as_tag_value().into_owned()),
                ));

                if error_type.should_emit_dropped_metrics() {
                    metrics.push((
                        HealthMetric::Distribution(
                            TRANSPORT_DROPPED_BYTES,
                            self.payload_bytes as i64,
                        ),
                        None,
                    ));
                    metrics.push((
                        HealthMetric::Distribution(
                            TRANSPORT_TRACES_DROPPED,
                            self.trace_chunks as i64,
                        ),
                        None,
                    ));
                }
            }
        }

        metrics
    }
}
