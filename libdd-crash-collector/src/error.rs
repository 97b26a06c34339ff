// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Fatal errors raised while constructing the collector. The HTTP request
/// path never produces one of these; malformed requests are handled per the
/// submission endpoint's own swallow-and-log contract.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("concurrent_saves must be >= 1, got {0}")]
    InvalidConcurrentSaves(i64),

    #[error("invalid bind address {0:?}: {1}")]
    InvalidBindAddress(String, #[source] std::net::AddrParseError),

    #[error("failed to bind listener on {0}: {1}")]
    Bind(std::net::SocketAddr, #[source] std::io::Error),
}

/// Error returned by a [`crate::storage::CrashStorage`] implementation.
/// Treated as transient by the worker pool: the report is re-enqueued and
/// retried indefinitely.
#[derive(Debug, Error)]
#[error("crash storage operation failed: {message}")]
pub struct StorageError {
    pub message: String,
    pub source: Option<anyhow::Error>,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn from_source(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}
