// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! OpenTelemetry OTLP profile types for the [profiles proto v1development].
//!
//! This module re-exports the generated protobuf types from [opentelemetry-proto]
//! for the [OpenTelemetry profiles] format. The wire format is defined by the
//! [profiles.proto] specification and is distinct from the pprof format (see
//! [libdd-profiling-protobuf]); OTEL profiles use a dictionary-based layout
//! with `ProfilesData`, `ProfilesDictionary`, `ResourceProfiles`, `ScopeProfiles`,
//! and per-profile `Profile` / `Sample` types.
//!
//! [profiles proto v1development]: https://github.com/open-telemetry/opentelemetry-proto/blob/main/opentelemetry/proto/profiles/v1development/profiles.proto
//! [opentelemetry-proto]: https://crates.io/crates/opentelemetry-proto
//! [OpenTelemetry profiles]: https://opentelemetry.io/docs/specs/otlp/
//! [profiles.proto]: https://github.com/open-telemetry/opentelemetry-proto/blob/main/opentelemetry/proto/profiles/v1development/profiles.proto
//! [libdd-profiling-protobuf]: https://github.com/DataDog/libdatadog/tree/main/libdd-profiling-protobuf

pub use opentelemetry_proto::tonic::profiles::v1development::*;

/// Re-export of [`prost::Message`] for encoding/decoding OTEL profile types.
pub use prost::Message;
