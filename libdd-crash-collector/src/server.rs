// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wires [`crate::endpoint::SubmissionEndpoint`] into a bound `hyper`
//! listener, following the same `hyper::server::conn::http1` +
//! `hyper_util::rt::TokioIo` connection-serving pattern used by
//! `datadog-remote-config`'s test server elsewhere in this workspace.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1::Builder as ConnBuilder;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::endpoint::SubmissionEndpoint;
use crate::error::CollectorError;
use crate::storage::CrashStorage;

/// Accepts connections on `config.bind_address` forever, dispatching every
/// `POST` to `endpoint` and a bare health check to the storage backend.
pub async fn serve(
    bind_address: std::net::SocketAddr,
    endpoint: Arc<SubmissionEndpoint>,
    storage: Arc<dyn CrashStorage>,
) -> Result<(), CollectorError> {
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(|e| CollectorError::Bind(bind_address, e))?;
    info!(%bind_address, "listening for crash submissions");
    run(listener, endpoint, storage).await
}

/// Accepts connections on an already-bound listener. Split out from
/// [`serve`] so tests can bind an ephemeral port (`127.0.0.1:0`), read back
/// the address the OS assigned, and drive the server end to end.
pub async fn run(
    listener: TcpListener,
    endpoint: Arc<SubmissionEndpoint>,
    storage: Arc<dyn CrashStorage>,
) -> Result<(), CollectorError> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let endpoint = Arc::clone(&endpoint);
        let storage = Arc::clone(&storage);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let endpoint = Arc::clone(&endpoint);
                let storage = Arc::clone(&storage);
                async move { route(req, endpoint, storage).await }
            });

            if let Err(e) = ConnBuilder::new().serve_connection(io, service).await {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

async fn route(
    req: Request<Incoming>,
    endpoint: Arc<SubmissionEndpoint>,
    storage: Arc<dyn CrashStorage>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/submit") | (&Method::POST, "/") => endpoint.handle(req).await,
        (&Method::GET, "/health") => Ok(health_response(storage.as_ref().check_health().await)),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .expect("building a response from static parts cannot fail")),
    }
}

fn health_response(result: Result<(), crate::error::StorageError>) -> Response<Full<Bytes>> {
    match result {
        Ok(()) => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from_static(b"ok")))
            .expect("building a response from static parts cannot fail"),
        Err(e) => {
            error!(error = %e, "storage health check failed");
            Response::builder()
                .status(StatusCode::SERVICE_UNAVAILABLE)
                .body(Full::new(Bytes::from(e.to_string())))
                .expect("building a response from static parts cannot fail")
        }
    }
}
