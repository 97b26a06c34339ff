// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Payload parsing: transparent gzip decompression followed
//! by multipart/form-data demultiplexing into a metadata map and a named
//! dump map. Every rejection path returns empty maps rather than an error --
//! the caller still issues a 200 response with a freshly generated crash ID
//! over the empty result.

use std::collections::HashMap;
use std::convert::Infallible;
use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use http::HeaderMap;
use md5::{Digest, Md5};

use crate::metrics::SharedMetrics;
use crate::report::{Dumps, Metadata, MetadataValue};

/// Decompresses (if gzipped) and demultiplexes a multipart body into a
/// metadata map and a named-dump map.
pub struct PayloadParser {
    metrics: SharedMetrics,
}

impl PayloadParser {
    pub fn new(metrics: SharedMetrics) -> Self {
        Self { metrics }
    }

    /// Parse an incoming request's headers and body. Never fails: any
    /// rejection condition yields `({}, {})` instead of an error.
    pub async fn parse(&self, headers: &HeaderMap, body: Bytes) -> (Metadata, Dumps) {
        let Some(boundary) = self.validate_content_type(headers) else {
            return (Metadata::new(), Dumps::new());
        };

        let content_length = headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        if content_length == 0 {
            return (Metadata::new(), Dumps::new());
        }

        let is_gzipped = headers
            .get(http::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("gzip"))
            .unwrap_or(false);

        let data = if is_gzipped {
            let compressed_len = body.len();
            match decompress_gzip(&body) {
                Ok(decompressed) => {
                    self.metrics.incr("gzipped_crash");
                    self.metrics
                        .histogram("crash_size.compressed", compressed_len as i64);
                    decompressed
                }
                Err(_) => {
                    self.metrics.incr("bad_gzipped_crash");
                    return (Metadata::new(), Dumps::new());
                }
            }
        } else {
            self.metrics
                .histogram("crash_size.uncompressed", body.len() as i64);
            body.to_vec()
        };

        self.demultiplex(data, boundary).await
    }

    /// Returns the boundary string if the `Content-Type` header names
    /// `multipart/form-data` with a boundary.
    fn validate_content_type(&self, headers: &HeaderMap) -> Option<String> {
        let content_type = headers.get(http::header::CONTENT_TYPE)?.to_str().ok()?;

        let parts: Vec<&str> = content_type.splitn(2, ';').collect();
        if parts.len() != 2 {
            return None;
        }
        if parts[0].trim() != "multipart/form-data" {
            return None;
        }
        let second = parts[1].trim();
        if !second.starts_with("boundary=") {
            return None;
        }
        Some(second.trim_start_matches("boundary=").trim_matches('"').to_string())
    }

    async fn demultiplex(&self, data: Vec<u8>, boundary: String) -> (Metadata, Dumps) {
        let mut metadata = Metadata::new();
        let mut dumps = Dumps::new();
        let mut checksums = HashMap::new();

        let stream = futures_util::stream::once(async move {
            Ok::<_, Infallible>(Bytes::from(data))
        });
        let mut multipart = multer::Multipart::new(stream, boundary);

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(_) => break,
            };

            let name = field.name().unwrap_or_default().to_string();
            if name == "dump_checksums" {
                continue;
            }

            let content_type = field.content_type().map(|m| m.to_string());
            let bytes = match field.bytes().await {
                Ok(b) => b,
                Err(_) => continue,
            };

            let is_octet_stream = content_type
                .as_deref()
                .map(|ct| ct.starts_with("application/octet-stream"))
                .unwrap_or(false);
            let is_text = std::str::from_utf8(&bytes).is_ok();

            if is_octet_stream || !is_text {
                let checksum = hex::encode(Md5::digest(&bytes));
                checksums.insert(name.clone(), checksum);
                dumps.insert(name, bytes.to_vec());
            } else {
                let value = strip_nulls(std::str::from_utf8(&bytes).unwrap_or_default());
                metadata.insert(name, MetadataValue::Text(value));
            }
        }

        if !checksums.is_empty() {
            metadata.insert(
                "dump_checksums".to_string(),
                MetadataValue::Checksums(checksums),
            );
        }

        (metadata, dumps)
    }
}

/// Decompress a gzip-formatted buffer, equivalent to Python's
/// `zlib.decompress(data, 16 + zlib.MAX_WBITS)` -- i.e. accept a gzip
/// header rather than a raw zlib stream.
fn decompress_gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Removes all U+0000 code points from `value`.
fn strip_nulls(value: &str) -> String {
    value.chars().filter(|&c| c != '\0').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoopMetrics;
    use http::header::{HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
    use std::io::Write;
    use std::sync::Arc;

    fn parser() -> PayloadParser {
        PayloadParser::new(Arc::new(NoopMetrics))
    }

    fn multipart_body(boundary: &str, fields: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, content_type, data) in fields {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
            );
            if !content_type.is_empty() {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    fn headers_for(boundary: &str, len: usize, gzip: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}")).unwrap(),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from_str(&len.to_string()).unwrap());
        if gzip {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }
        headers
    }

    #[tokio::test]
    async fn missing_content_type_yields_empty() {
        let (md, dumps) = parser().parse(&HeaderMap::new(), Bytes::new()).await;
        assert!(md.is_empty());
        assert!(dumps.is_empty());
    }

    #[tokio::test]
    async fn wrong_content_type_yields_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("5"));
        let (md, dumps) = parser().parse(&headers, Bytes::from_static(b"hello")).await;
        assert!(md.is_empty());
        assert!(dumps.is_empty());
    }

    #[tokio::test]
    async fn zero_content_length_yields_empty() {
        let headers = headers_for("boundary123", 0, false);
        let (md, dumps) = parser().parse(&headers, Bytes::new()).await;
        assert!(md.is_empty());
        assert!(dumps.is_empty());
    }

    #[tokio::test]
    async fn parses_text_and_dump_fields() {
        let boundary = "xYzZY";
        let body = multipart_body(
            boundary,
            &[
                ("ProductName", "text/plain", b"Firefox"),
                (
                    "upload_file_minidump",
                    "application/octet-stream",
                    &[0xAA, 0xBB, 0xCC],
                ),
            ],
        );
        let headers = headers_for(boundary, body.len(), false);
        let (md, dumps) = parser().parse(&headers, Bytes::from(body)).await;

        assert_eq!(md.get("ProductName").unwrap().as_text(), Some("Firefox"));
        assert_eq!(dumps.get("upload_file_minidump").unwrap(), &vec![0xAA, 0xBB, 0xCC]);
        let checksums = md.get("dump_checksums").unwrap().as_checksums().unwrap();
        assert_eq!(
            checksums.get("upload_file_minidump").unwrap(),
            "2a710b90db240c7a43be7fdc11d0bc53"
        );
    }

    #[tokio::test]
    async fn discards_client_supplied_dump_checksums_field() {
        let boundary = "xYzZY";
        let body = multipart_body(boundary, &[("dump_checksums", "text/plain", b"{\"x\":\"y\"}")]);
        let headers = headers_for(boundary, body.len(), false);
        let (md, _dumps) = parser().parse(&headers, Bytes::from(body)).await;
        assert!(!md.contains_key("dump_checksums"));
    }

    #[tokio::test]
    async fn strips_null_bytes_from_text_fields() {
        let boundary = "xYzZY";
        let body = multipart_body(boundary, &[("Comment", "text/plain", b"foo\0bar")]);
        let headers = headers_for(boundary, body.len(), false);
        let (md, _dumps) = parser().parse(&headers, Bytes::from(body)).await;
        assert_eq!(md.get("Comment").unwrap().as_text(), Some("foobar"));
    }

    #[tokio::test]
    async fn gzipped_body_decompresses_transparently() {
        let boundary = "xYzZY";
        let raw = multipart_body(boundary, &[("ProductName", "text/plain", b"Firefox")]);
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&raw).unwrap();
        let gzipped = encoder.finish().unwrap();

        let headers = headers_for(boundary, gzipped.len(), true);
        let (md, _dumps) = parser().parse(&headers, Bytes::from(gzipped)).await;
        assert_eq!(md.get("ProductName").unwrap().as_text(), Some("Firefox"));
    }

    #[tokio::test]
    async fn bad_gzip_yields_empty() {
        let headers = headers_for("boundary123", 8, true);
        let (md, dumps) = parser().parse(&headers, Bytes::from_static(b"not gzip")).await;
        assert!(md.is_empty());
        assert!(dumps.is_empty());
    }
}
