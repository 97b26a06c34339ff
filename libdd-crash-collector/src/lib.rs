// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ingestion endpoint for a crash-report collector.
//!
//! Accepts crash reports over HTTP, parses their (possibly gzipped)
//! multipart payloads, runs them through a pluggable throttling decision,
//! assigns a stable crash ID, and hands each accepted or deferred report to
//! a bounded pool of workers that persist it to a pluggable storage
//! backend, retrying indefinitely on transient failure.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod heartbeat;
pub mod id_generator;
pub mod metrics;
pub mod payload;
pub mod queue;
pub mod report;
pub mod server;
pub mod storage;
pub mod throttle;
pub mod worker;
