// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pluggable storage backend. Implementations must be
//! idempotent with respect to `crash_id`: the worker pool retries both
//! `save_dumps` and `save_raw_crash` indefinitely on transient failure, and
//! may re-save content that already landed.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::StorageError;
use crate::report::Metadata;

/// Persists dump blobs and structured metadata addressed by crash ID.
#[async_trait]
pub trait CrashStorage: Send + Sync {
    async fn save_dumps(
        &self,
        crash_id: &str,
        dumps: &HashMap<String, Vec<u8>>,
    ) -> Result<(), StorageError>;

    async fn save_raw_crash(&self, crash_id: &str, metadata: &Metadata) -> Result<(), StorageError>;

    /// Optional health check, delegated to by the collector's own health
    /// endpoint. Defaults to healthy.
    async fn check_health(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Discards everything. Matches Antenna's
/// `antenna.ext.crashstorage_base.NoOpCrashStorage`, the default
/// `crashstorage_class`.
#[derive(Debug, Default)]
pub struct NoopCrashStorage;

#[async_trait]
impl CrashStorage for NoopCrashStorage {
    async fn save_dumps(
        &self,
        _crash_id: &str,
        _dumps: &HashMap<String, Vec<u8>>,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn save_raw_crash(&self, _crash_id: &str, _metadata: &Metadata) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_storage_always_succeeds() {
        let storage = NoopCrashStorage;
        assert!(storage.save_dumps("id", &HashMap::new()).await.is_ok());
        assert!(storage
            .save_raw_crash("id", &Metadata::new())
            .await
            .is_ok());
        assert!(storage.check_health().await.is_ok());
    }
}
