// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Crash ID generation.
//!
//! The exact byte layout other collector tooling expects from a crash ID is
//! an external contract this core doesn't have full visibility into, so
//! rather than inventing a from-scratch layout we preserve the two required
//! properties: a single fixed position encodes the throttle marker, and a
//! fixed suffix encodes the submission date, inside an otherwise-standard
//! 36-character (RFC 4122 shaped) lowercase identifier.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::throttle::Decision;

/// Throttle marker digit embedded at a fixed position in the generated ID:
/// `0` for ACCEPT, `1` for DEFER. REJECT never reaches this function because
/// rejected reports are never assigned an ID.
fn throttle_marker(decision: Decision) -> char {
    match decision {
        Decision::Accept => '0',
        Decision::Defer => '1',
        Decision::Reject => 'x',
    }
}

/// Generates a fresh 36-character lowercase crash ID for `timestamp`,
/// encoding `decision`'s throttle marker and `timestamp`'s date. If the
/// submission already carried a client-supplied `uuid`, callers should reuse
/// that instead of calling this function.
pub fn new_id(timestamp: DateTime<Utc>, decision: Decision) -> String {
    let mut id = Uuid::new_v4().as_hyphenated().to_string();

    // Position 24 is the first character of the UUID's final group
    // (`xxxxxxxx-xxxx-xxxx-xxxx-XXXXXXXXXXXX`); stomp it with the throttle
    // marker so later consumers can read ACCEPT vs DEFER from a fixed byte
    // offset without touching grouping dashes.
    let marker_pos = 24;
    let marker = throttle_marker(decision);
    id.replace_range(marker_pos..marker_pos + 1, &marker.to_string());

    // The last 6 characters of the identifier carry a yymmdd date suffix.
    let date_suffix = timestamp.format("%y%m%d").to_string();
    let len = id.len();
    id.replace_range(len - 6..len, &date_suffix);

    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generates_36_char_lowercase_id() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let id = new_id(ts, Decision::Accept);
        assert_eq!(id.len(), 36);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn encodes_throttle_marker_at_fixed_position() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let accept_id = new_id(ts, Decision::Accept);
        let defer_id = new_id(ts, Decision::Defer);
        assert_eq!(accept_id.chars().nth(24), Some('0'));
        assert_eq!(defer_id.chars().nth(24), Some('1'));
    }

    #[test]
    fn encodes_date_suffix() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let id = new_id(ts, Decision::Accept);
        assert!(id.ends_with("260727"));
    }

    #[test]
    fn ids_are_distinct_across_calls() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let a = new_id(ts, Decision::Accept);
        let b = new_id(ts, Decision::Accept);
        assert_ne!(a, b);
    }
}
