// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#[cfg(feature = "mini_agent")]
pub use mini_agent::*;

#[cfg(feature = "mini_agent")]
mod mini_agent {
    use datadog_trace_protobuf::pb;
    use ddcommon::hyper_migration;
    use ddcommon::Endpoint;
    use http_body_util::BodyExt;
    use hyper::{body::Buf, Method, Request, StatusCode};
    use std::io::Write;
    use tracing::debug;

    pub async fn get_stats_from_request_body(
        body: hyper_migration::Body,
    ) -> anyhow::Result<pb::ClientStatsPayload> {
        let buffer = body.collect().await?.aggregate();

        let client_stats_payload: pb::ClientStatsPayload =
            match rmp_serde::from_read(buffer.reader()) {
                Ok(res) => res,
                Err(err) => {
                    anyhow::bail!("Error deserializing stats from request body: {err}")
                }
            };

        if client_stats_payload.stats.is_empty() {
            debug!("Empty trace stats payload received, but this is okay");
        }
        Ok(client_stats_payload)
    }

    pub fn construct_stats_payload(stats: Vec<pb::ClientStatsPayload>) -> pb::StatsPayload {
        pb::StatsPayload {
            agent_hostname: "".to_string(),
            agent_env: "".to_string(),
            stats,
            agent_version: "".to_string(),
            client_computed: true,
            split_payload: false,
        }
    }

    pub fn serialize_stats_payload(payload: pb::StatsPayload) -> anyhow::Result<Vec<u8>> {
        let msgpack = rmp_serde::to_vec_named(&payload)?;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(&msgpack)?;
        match encoder.finish() {
            Ok(res) => Ok(res),
            Err(e) => anyhow::bail!("Error serializing stats payload: {e}"),
        }
    }

    pub async fn send_stats_payload(
        data: Vec<u8>,
        target: &Endpoint,
        api_key: &str,
    ) -> anyhow::Result<()> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(target.url.clone())
            .header("Content-Type", "application/msgpack")
            .header("Content-Encoding", "gzip")
            .header("DD-API-KEY", api_key)
            .body(hyper_migration::Body::from(data.clone()))?;

        let client = hyper_migration::new_default_client();
        match client.request(req).await {
            Ok(response) => {
                if response.status() != StatusCode::ACCEPTED {
                    let body_bytes = response.into_body().collect().await?.to_bytes();
                    let response_body = String::from_utf8(body_bytes.to_vec()).unwrap_or_default();
                    anyhow::bail!("Server did not accept trace stats: {response_body}");
                }
                Ok(())
            }
            Err(e) => anyhow::bail!("Failed to send trace stats: {e}"),
        }
    }
}
