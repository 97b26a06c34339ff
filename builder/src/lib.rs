// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod arch;
pub mod builder;
pub mod common;
#[cfg(feature = "crashtracker")]
pub mod crashtracker;
pub mod module;
pub mod utils;

#[cfg(feature = "profiling")]
pub mod profiling;
