// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod config;
mod errors;
mod file_exporter;
mod profile_exporter;
pub mod utils;
pub use profile_exporter::*;
