// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::trace_exporter::TracerMetadata;
use bytes::Bytes;
use hyper::Uri;
use std::collections::HashMap;

/// Transport client for trace exporter operations
///
/// This struct is responsible for building HTTP requests for trace data.
/// Response handling and metric emission are handled by TraceExporter.
pub(super) struct TransportClient<'a> {
    metadata: &'a TracerMetadata,
}

impl<'a> TransportClient<'a> {
    /// Create a new transport client
    pub(super) fn new(metadata: &'a TracerMetadata) -> Self {
        Self { metadata }
    }

    /// Build HTTP request for sending trace data to agent
    pub(super) fn build_trace_request(
        &self,
        data: &[u8],
        trace_count: usize,
        uri: Uri,
    ) -> Result<http::Request<Bytes>, http::Error> {
        let headers: HashMap<&'static str, String> = self.metadata.into();

        let mut builder = http::Request::builder()
            .method(http::Method::POST)
            .uri(uri)
            .header("user-agent", concat!("Tracer/", env!("CARGO_PKG_VERSION")))
            .header("content-type", "application/msgpack")
            .header("X-Datadog-Trace-Count", trace_count.to_string());

        for (key, value) in &headers {
            builder = builder.header(*key, value.as_str());
        }

        builder.body(Bytes::from(data.to_vec()))
    }
}
