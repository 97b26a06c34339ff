// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end coverage of the submission endpoint over a real TCP listener,
//! covering the happy path, gzip, bad gzip, reject, client-supplied uuid,
//! and storage-retry scenarios that need an actual `hyper::body::Incoming`
//! request to exercise.

use std::collections::HashMap;
use std::io::Write as _;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use libdd_crash_collector::config::Config;
use libdd_crash_collector::endpoint::SubmissionEndpoint;
use libdd_crash_collector::error::StorageError;
use libdd_crash_collector::metrics::{MetricsSink, SharedMetrics};
use libdd_crash_collector::queue::SaveQueue;
use libdd_crash_collector::report::Metadata;
use libdd_crash_collector::server;
use libdd_crash_collector::storage::CrashStorage;
use libdd_crash_collector::throttle::{AcceptAllThrottler, Decision, Throttler};
use libdd_crash_collector::worker::WorkerPool;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct RecordingStorage {
    dumps: tokio::sync::Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
    raw: tokio::sync::Mutex<HashMap<String, Metadata>>,
    fail_raw_crash_times: AtomicU32,
}

#[async_trait]
impl CrashStorage for RecordingStorage {
    async fn save_dumps(
        &self,
        crash_id: &str,
        dumps: &HashMap<String, Vec<u8>>,
    ) -> Result<(), StorageError> {
        self.dumps
            .lock()
            .await
            .insert(crash_id.to_string(), dumps.clone());
        Ok(())
    }

    async fn save_raw_crash(&self, crash_id: &str, metadata: &Metadata) -> Result<(), StorageError> {
        if self.fail_raw_crash_times.load(Ordering::SeqCst) > 0 {
            self.fail_raw_crash_times.fetch_sub(1, Ordering::SeqCst);
            return Err(StorageError::new("transient"));
        }
        self.raw
            .lock()
            .await
            .insert(crash_id.to_string(), metadata.clone());
        Ok(())
    }
}

struct RejectAllThrottler;

#[async_trait]
impl Throttler for RejectAllThrottler {
    async fn throttle(&self, _metadata: &Metadata) -> (Decision, String, u8) {
        (Decision::Reject, "REJECT_ALL".to_string(), 0)
    }
}

struct Harness {
    addr: SocketAddr,
    queue: Arc<SaveQueue>,
    pool: Arc<WorkerPool>,
    storage: Arc<RecordingStorage>,
}

async fn spawn_harness(throttler: Arc<dyn Throttler>, storage: Arc<RecordingStorage>) -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let metrics: SharedMetrics = Arc::new(libdd_crash_collector::metrics::NoopMetrics);
    let queue = Arc::new(SaveQueue::new());
    let storage_dyn: Arc<dyn CrashStorage> = storage.clone();
    let pool = Arc::new(WorkerPool::new(
        Arc::clone(&queue),
        Arc::clone(&storage_dyn),
        Arc::clone(&metrics),
        10,
    ));

    let endpoint = Arc::new(SubmissionEndpoint::new(
        Config::default(),
        throttler,
        Arc::clone(&pool),
        metrics,
    ));

    tokio::spawn(server::run(listener, endpoint, storage_dyn));

    Harness {
        addr,
        queue,
        pool,
        storage,
    }
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

async fn post(addr: SocketAddr, extra_headers: &[(&str, &str)], body: &[u8]) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut request = format!(
        "POST /submit HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\nContent-Length: {}\r\n",
        body.len()
    );
    for (k, v) in extra_headers {
        request.push_str(&format!("{k}: {v}\r\n"));
    }
    request.push_str("\r\n");

    stream.write_all(request.as_bytes()).await.unwrap();
    stream.write_all(body).await.unwrap();
    stream.shutdown().await.ok();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8_lossy(&raw).to_string();

    let mut parts = raw.splitn(2, "\r\n\r\n");
    let head = parts.next().unwrap_or_default();
    let resp_body = parts.next().unwrap_or_default();
    let status_line = head.lines().next().unwrap_or_default();
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    (status, head.to_string(), resp_body.to_string())
}

#[tokio::test]
async fn s1_happy_path_uncompressed() {
    let storage = Arc::new(RecordingStorage::default());
    let harness = spawn_harness(Arc::new(AcceptAllThrottler), Arc::clone(&storage)).await;

    let boundary = "xYzZY1";
    let body = multipart_body(
        boundary,
        &[
            ("ProductName", "text/plain", b"Firefox"),
            ("upload_file_minidump", "application/octet-stream", &[0xAA, 0xBB, 0xCC]),
        ],
    );
    let (status, head, resp_body) = post(
        harness.addr,
        &[("Content-Type", &format!("multipart/form-data; boundary={boundary}"))],
        &body,
    )
    .await;

    assert_eq!(status, 200);
    assert!(head.contains("text/plain"));
    assert!(resp_body.starts_with("CrashID=bp-"));
    assert_eq!(resp_body.trim_end().len(), "CrashID=bp-".len() + 36);

    harness.pool.join_pool().await;

    let dumps = storage.dumps.lock().await;
    assert_eq!(dumps.len(), 1);
    let (_, saved_dumps) = dumps.iter().next().unwrap();
    assert_eq!(saved_dumps.get("upload_file_minidump").unwrap(), &vec![0xAA, 0xBB, 0xCC]);

    let raw = storage.raw.lock().await;
    let (_, metadata) = raw.iter().next().unwrap();
    assert_eq!(metadata.get("ProductName").unwrap().as_text(), Some("Firefox"));
    assert_eq!(metadata.get("legacy_processing").unwrap().as_int(), Some(0));
    assert_eq!(metadata.get("throttle_rate").unwrap().as_int(), Some(100));
    assert_eq!(metadata.get("type_tag").unwrap().as_text(), Some("bp"));
    let checksums = metadata.get("dump_checksums").unwrap().as_checksums().unwrap();
    assert_eq!(
        checksums.get("upload_file_minidump").unwrap(),
        "2a710b90db240c7a43be7fdc11d0bc53"
    );
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn s2_gzipped_body_decompresses_to_same_result() {
    let storage = Arc::new(RecordingStorage::default());
    let harness = spawn_harness(Arc::new(AcceptAllThrottler), Arc::clone(&storage)).await;

    let boundary = "xYzZY2";
    let raw = multipart_body(
        boundary,
        &[
            ("ProductName", "text/plain", b"Firefox"),
            ("upload_file_minidump", "application/octet-stream", &[0xAA, 0xBB, 0xCC]),
        ],
    );
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&raw).unwrap();
    let gzipped = encoder.finish().unwrap();

    let (status, head, resp_body) = post(
        harness.addr,
        &[
            ("Content-Type", &format!("multipart/form-data; boundary={boundary}")),
            ("Content-Encoding", "gzip"),
        ],
        &gzipped,
    )
    .await;

    assert_eq!(status, 200);
    assert!(head.contains("text/plain"));
    assert!(resp_body.starts_with("CrashID=bp-"));

    harness.pool.join_pool().await;

    let raw_stored = storage.raw.lock().await;
    let (_, metadata) = raw_stored.iter().next().unwrap();
    assert_eq!(metadata.get("ProductName").unwrap().as_text(), Some("Firefox"));
    let checksums = metadata.get("dump_checksums").unwrap().as_checksums().unwrap();
    assert_eq!(
        checksums.get("upload_file_minidump").unwrap(),
        "2a710b90db240c7a43be7fdc11d0bc53"
    );
}

#[tokio::test]
async fn s4_reject_never_reaches_storage() {
    let storage = Arc::new(RecordingStorage::default());
    let harness = spawn_harness(Arc::new(RejectAllThrottler), Arc::clone(&storage)).await;

    let boundary = "xYzZY4";
    let body = multipart_body(boundary, &[("ProductName", "text/plain", b"Firefox")]);
    let (status, _head, resp_body) = post(
        harness.addr,
        &[("Content-Type", &format!("multipart/form-data; boundary={boundary}"))],
        &body,
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(resp_body, "Discarded=1");
    assert!(harness.queue.is_empty());
    harness.pool.join_pool().await;
    assert!(storage.dumps.lock().await.is_empty());
    assert!(storage.raw.lock().await.is_empty());
}

#[tokio::test]
async fn s5_client_supplied_uuid_is_reused() {
    let storage = Arc::new(RecordingStorage::default());
    let harness = spawn_harness(Arc::new(AcceptAllThrottler), Arc::clone(&storage)).await;

    let boundary = "xYzZY5";
    let client_uuid = "11111111-2222-3333-4444-555555555555";
    let body = multipart_body(boundary, &[("uuid", "text/plain", client_uuid.as_bytes())]);
    let (status, _head, resp_body) = post(
        harness.addr,
        &[("Content-Type", &format!("multipart/form-data; boundary={boundary}"))],
        &body,
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(resp_body.trim_end(), format!("CrashID=bp-{client_uuid}"));
    harness.pool.join_pool().await;
}

#[tokio::test]
async fn s3_bad_gzip_still_responds_with_fresh_id() {
    let storage = Arc::new(RecordingStorage::default());
    let harness = spawn_harness(Arc::new(AcceptAllThrottler), Arc::clone(&storage)).await;

    let (status, _head, resp_body) = post(
        harness.addr,
        &[
            ("Content-Type", "multipart/form-data; boundary=whatever"),
            ("Content-Encoding", "gzip"),
        ],
        b"not gzip",
    )
    .await;

    assert_eq!(status, 200);
    assert!(resp_body.starts_with("CrashID=bp-"));
    harness.pool.join_pool().await;

    let raw = storage.raw.lock().await;
    let (_, metadata) = raw.iter().next().unwrap();
    // Parser returned empty maps; only the core's own inserted keys exist.
    assert!(!metadata.contains_key("ProductName"));
}

#[tokio::test]
async fn s6_retries_on_transient_storage_failure() {
    let storage = Arc::new(RecordingStorage {
        fail_raw_crash_times: AtomicU32::new(1),
        ..Default::default()
    });
    let harness = spawn_harness(Arc::new(AcceptAllThrottler), Arc::clone(&storage)).await;

    let boundary = "xYzZY6";
    let body = multipart_body(boundary, &[("ProductName", "text/plain", b"Firefox")]);
    let (status, _head, resp_body) = post(
        harness.addr,
        &[("Content-Type", &format!("multipart/form-data; boundary={boundary}"))],
        &body,
    )
    .await;

    assert_eq!(status, 200);
    assert!(resp_body.starts_with("CrashID=bp-"));

    harness.pool.join_pool().await;
    assert_eq!(storage.raw.lock().await.len(), 1);
    assert_eq!(storage.fail_raw_crash_times.load(Ordering::SeqCst), 0);
}
