// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::CollectorError;

const ENV_DUMP_FIELD: &str = "DD_CRASH_COLLECTOR_DUMP_FIELD";
const ENV_DUMP_ID_PREFIX: &str = "DD_CRASH_COLLECTOR_DUMP_ID_PREFIX";
const ENV_CONCURRENT_SAVES: &str = "DD_CRASH_COLLECTOR_CONCURRENT_SAVES";
const ENV_BIND_ADDRESS: &str = "DD_CRASH_COLLECTOR_BIND_ADDRESS";
const ENV_HEARTBEAT_INTERVAL_SECS: &str = "DD_CRASH_COLLECTOR_HEARTBEAT_INTERVAL_SECS";

const DEFAULT_DUMP_FIELD: &str = "upload_file_minidump";
const DEFAULT_DUMP_ID_PREFIX: &str = "bp-";
const DEFAULT_CONCURRENT_SAVES: i64 = 10;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Runtime configuration for the collector, loaded from `DD_CRASH_COLLECTOR_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the POST field carrying the primary minidump. Informational
    /// only in this core; retained so operators can see which
    /// field name their client agents are expected to use.
    pub dump_field: String,
    /// Prepended to the crash ID in the response body; trailing `-` stripped
    /// becomes `metadata.type_tag`.
    pub dump_id_prefix: String,
    /// Worker-pool size. Must be >= 1.
    pub concurrent_saves: usize,
    /// Address the HTTP server binds to.
    pub bind_address: SocketAddr,
    /// Heartbeat period.
    pub heartbeat_interval: Duration,
}

impl Config {
    /// Load configuration from the environment, applying defaults for any
    /// variable that is unset. Fails fast if `concurrent_saves < 1`.
    pub fn from_env() -> Result<Self, CollectorError> {
        let dump_field =
            std::env::var(ENV_DUMP_FIELD).unwrap_or_else(|_| DEFAULT_DUMP_FIELD.to_string());
        let dump_id_prefix = std::env::var(ENV_DUMP_ID_PREFIX)
            .unwrap_or_else(|_| DEFAULT_DUMP_ID_PREFIX.to_string());

        let concurrent_saves = match std::env::var(ENV_CONCURRENT_SAVES) {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|_| CollectorError::InvalidConcurrentSaves(-1))?,
            Err(_) => DEFAULT_CONCURRENT_SAVES,
        };
        if concurrent_saves < 1 {
            return Err(CollectorError::InvalidConcurrentSaves(concurrent_saves));
        }

        let bind_address_raw =
            std::env::var(ENV_BIND_ADDRESS).unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address_raw
            .parse()
            .map_err(|e| CollectorError::InvalidBindAddress(bind_address_raw.clone(), e))?;

        let heartbeat_interval_secs = match std::env::var(ENV_HEARTBEAT_INTERVAL_SECS) {
            Ok(raw) => raw.parse().unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            Err(_) => DEFAULT_HEARTBEAT_INTERVAL_SECS,
        };

        Ok(Self {
            dump_field,
            dump_id_prefix,
            concurrent_saves: concurrent_saves as usize,
            bind_address,
            heartbeat_interval: Duration::from_secs(heartbeat_interval_secs),
        })
    }

    /// `type_tag` is the configured prefix with any trailing `-` stripped.
    pub fn type_tag(&self) -> &str {
        self.dump_id_prefix.trim_end_matches('-')
    }

    /// Enumerate the effective settings, for startup logging and ad-hoc
    /// introspection (mirrors Antenna's `get_runtime_config`).
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dump_field", self.dump_field.clone()),
            ("dump_id_prefix", self.dump_id_prefix.clone()),
            ("concurrent_saves", self.concurrent_saves.to_string()),
            ("bind_address", self.bind_address.to_string()),
            (
                "heartbeat_interval_secs",
                self.heartbeat_interval.as_secs().to_string(),
            ),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dump_field: DEFAULT_DUMP_FIELD.to_string(),
            dump_id_prefix: DEFAULT_DUMP_ID_PREFIX.to_string(),
            concurrent_saves: DEFAULT_CONCURRENT_SAVES as usize,
            bind_address: DEFAULT_BIND_ADDRESS.parse().unwrap(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.dump_field, "upload_file_minidump");
        assert_eq!(cfg.dump_id_prefix, "bp-");
        assert_eq!(cfg.concurrent_saves, 10);
        assert_eq!(cfg.type_tag(), "bp");
    }

    #[test]
    fn type_tag_strips_trailing_dash_only() {
        let mut cfg = Config::default();
        cfg.dump_id_prefix = "socorro-".to_string();
        assert_eq!(cfg.type_tag(), "socorro");
    }
}
