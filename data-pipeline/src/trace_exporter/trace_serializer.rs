// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::trace_exporter::agent_response::{
    AgentResponsePayloadVersion, DATADOG_RATES_PAYLOAD_VERSION_HEADER,
};
use crate::trace_exporter::error::TraceExporterError;
use crate::trace_exporter::TraceExporterOutputFormat;
use datadog_trace_utils::msgpack_decoder::decode::error::DecodeError;
use datadog_trace_utils::msgpack_encoder;
use datadog_trace_utils::span::{Span, SpanText};
use datadog_trace_utils::trace_utils::{self, TracerHeaderTags};
use datadog_trace_utils::tracer_payload;
use ddcommon::header::{
    APPLICATION_MSGPACK_STR, DATADOG_SEND_REAL_HTTP_STATUS_STR, DATADOG_TRACE_COUNT_STR,
};
use hyper::header::CONTENT_TYPE;
use std::collections::HashMap;

/// Prepared traces payload ready for sending to the agent
pub(super) struct PreparedTracesPayload {
    /// Serialized msgpack payload
    pub data: Vec<u8>,
    /// HTTP headers for the request
    pub headers: HashMap<&'static str, String>,
    /// Number of trace chunks
    pub chunk_count: usize,
}

/// Trace serialization client for handling payload preparation
pub(super) struct TraceSerializer<'a> {
    output_format: TraceExporterOutputFormat,
    agent_payload_response_version: Option<&'a AgentResponsePayloadVersion>,
}

impl<'a> TraceSerializer<'a> {
    /// Create a new trace serializer
    pub(super) fn new(
        output_format: TraceExporterOutputFormat,
        agent_payload_response_version: Option<&'a AgentResponsePayloadVersion>,
    ) -> Self {
        Self {
            output_format,
            agent_payload_response_version,
        }
    }

    /// Prepare traces payload and HTTP headers for sending to agent
    pub(super) fn prepare_traces_payload<T: SpanText>(
        &self,
        traces: Vec<Vec<Span<T>>>,
        header_tags: TracerHeaderTags,
    ) -> Result<PreparedTracesPayload, TraceExporterError> {
        let payload = self.collect_and_process_traces(traces)?;
        let chunks = payload.size();
        let headers = self.build_traces_headers(header_tags, chunks);
        let mp_payload = self.serialize_payload(&payload)?;

        Ok(PreparedTracesPayload {
            data: mp_payload,
            headers,
            chunk_count: chunks,
        })
    }

    /// Collect trace chunks based on output format
    fn collect_and_process_traces<T: SpanText>(
        &self,
        traces: Vec<Vec<Span<T>>>,
    ) -> Result<tracer_payload::TraceChunks<T>, TraceExporterError> {
        let use_v05_format = match self.output_format {
            TraceExporterOutputFormat::V05 => true,
            TraceExporterOutputFormat::V04 => false,
        };
        trace_utils::collect_trace_chunks(traces, use_v05_format).map_err(|e| {
            TraceExporterError::Deserialization(DecodeError::InvalidFormat(e.to_string()))
        })
    }

    /// Build HTTP headers for traces request
    fn build_traces_headers(
        &self,
        header_tags: TracerHeaderTags,
        chunk_count: usize,
    ) -> HashMap<&'static str, String> {
        let mut headers: HashMap<&'static str, String> = header_tags.into();
        headers.insert(DATADOG_SEND_REAL_HTTP_STATUS_STR, "1".to_string());
        headers.insert(DATADOG_TRACE_COUNT_STR, chunk_count.to_string());
        headers.insert(CONTENT_TYPE.as_str(), APPLICATION_MSGPACK_STR.to_string());
        if let Some(agent_payload_response_version) = &self.agent_payload_response_version {
            headers.insert(
                DATADOG_RATES_PAYLOAD_VERSION_HEADER,
                agent_payload_response_version.header_value(),
            );
        }
        headers
    }

    /// Serialize payload to msgpack format
    fn serialize_payload<T: SpanText>(
        &self,
        payload: &tracer_payload::TraceChunks<T>,
    ) -> Result<Vec<u8>, TraceExporterError> {
        match payload {
            tracer_payload::TraceChunks::V04(p) => Ok(msgpack_encoder::v04::to_vec(p)),
            tracer_payload::TraceChunks::V05(p) => {
                rmp_serde::to_vec(p).map_err(TraceExporterError::Serialization)
            }
        }
    }
}
