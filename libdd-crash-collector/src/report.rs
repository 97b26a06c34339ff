// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

/// A metadata value as submitted by a client. Free-form fields are text;
/// the core writes a handful of reserved keys (`legacy_processing`,
/// `throttle_rate`) as integers.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Int(i64),
    /// `timestamp` is the one reserved key carrying sub-second precision
    /// of receipt").
    Float(f64),
    /// The one structured reserved key: `dump_checksums`, a map from
    /// dump-name to lowercase hex MD5.
    Checksums(HashMap<String, String>),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            MetadataValue::Text(s) => s.parse().ok(),
            MetadataValue::Float(_) | MetadataValue::Checksums(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(f) => Some(*f),
            MetadataValue::Int(i) => Some(*i as f64),
            MetadataValue::Text(s) => s.parse().ok(),
            MetadataValue::Checksums(_) => None,
        }
    }

    pub fn as_checksums(&self) -> Option<&HashMap<String, String>> {
        match self {
            MetadataValue::Checksums(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

/// Metadata map keyed by short text field names. Reserved keys the core
/// reads or writes: `uuid`, `submitted_timestamp`, `timestamp`,
/// `legacy_processing`, `throttle_rate`, `type_tag`, `dump_checksums`,
/// `Throttleable`.
pub type Metadata = HashMap<String, MetadataValue>;

/// Dump-name -> opaque binary blob, as submitted by the client.
pub type Dumps = HashMap<String, Vec<u8>>;

/// An immutable crash report ready to be queued for storage.
///
/// Constructed only by [`crate::endpoint::SubmissionEndpoint`] after a
/// successful parse and a non-reject throttle decision. Once built,
/// `metadata[uuid] == crash_id` and
/// `metadata[dump_checksums]` carries one entry per key in `dumps` --
/// callers should not need to mutate it further.
#[derive(Debug, Clone)]
pub struct CrashReport {
    pub metadata: Metadata,
    pub dumps: Dumps,
    pub crash_id: String,
}

impl CrashReport {
    pub fn new(metadata: Metadata, dumps: Dumps, crash_id: String) -> Self {
        Self {
            metadata,
            dumps,
            crash_id,
        }
    }
}
