// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::ProfileExporter;
use crate::{exporter::File, internal::EncodedProfile};
use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use libdd_common::tag::Tag;
use reqwest::RequestBuilder;
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct ExporterManager {
    cancel: CancellationToken,
    exporter: ProfileExporter,
    handle: JoinHandle<anyhow::Result<()>>,
    sender: Sender<RequestBuilder>,
    receiver: Receiver<RequestBuilder>,
}

pub struct SuspendedExporterManager {
    exporter: ProfileExporter,
    inflight: Vec<RequestBuilder>,
}

impl SuspendedExporterManager {
    /// Returns the number of inflight (unprocessed) requests
    ///
    /// This is primarily useful for testing and observability.
    #[cfg(test)]
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Consumes the suspended manager and returns the inner components
    fn into_parts(self) -> (ProfileExporter, Vec<RequestBuilder>) {
        (self.exporter, self.inflight)
    }
}

impl ExporterManager {
    pub fn new(exporter: ProfileExporter) -> anyhow::Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded(2);
        let cancel = CancellationToken::new();
        let cloned_receiver: Receiver<RequestBuilder> = receiver.clone();
        let cloned_cancel = cancel.clone();
        let handle = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                loop {
                    let Ok(msg) = cloned_receiver.recv() else {
                        return;
                    };
                    if cloned_cancel
                        .run_until_cancelled(msg.send())
                        .await
                        .is_none()
                    {
                        return;
                    }
                    // TODO: Add logging for failed uploads.
                }
            });
            Ok(())
        });
        Ok(Self {
            cancel,
            exporter,
            handle,
            sender,
            receiver,
        })
    }

    pub fn abort(self) -> anyhow::Result<SuspendedExporterManager> {
        self.cancel.cancel();

        // Drain any pending messages from the channel before shutting down
        let inflight: Vec<_> = self.receiver.try_iter().collect();

        // Drop the sender to disconnect the channel and unblock recv() in the worker thread
        drop(self.sender);
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("unable to join thread"))?
            .context("worker thread returned error")?;

        Ok(SuspendedExporterManager {
            exporter: self.exporter,
            inflight,
        })
    }

    pub fn prefork(self) -> anyhow::Result<SuspendedExporterManager> {
        self.abort()
    }

    pub fn postfork_child(suspended: SuspendedExporterManager) -> anyhow::Result<Self> {
        let (exporter, _inflight) = suspended.into_parts();
        Self::new(exporter)
    }

    pub fn postfork_parent(suspended: SuspendedExporterManager) -> anyhow::Result<Self> {
        let (exporter, inflight) = suspended.into_parts();
        let manager = Self::new(exporter)?;
        for msg in inflight {
            manager.sender.send(msg)?;
        }
        Ok(manager)
    }

    pub fn queue(
        &self,
        profile: EncodedProfile,
        additional_files: &[File<'_>],
        additional_tags: &[Tag],
        internal_metadata: Option<serde_json::Value>,
        info: Option<serde_json::Value>,
        process_tags: Option<&str>,
    ) -> anyhow::Result<()> {
        let msg = self.exporter.build(
            profile,
            additional_files,
            additional_tags,
            internal_metadata,
            info,
            process_tags,
        )?;
        // TODO, use thiserror and get back the actual error if one.
        self.sender.try_send(msg)?;
        Ok(())
    }
}
