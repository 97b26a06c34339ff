// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod flag_type;

pub mod rules_based;

pub use flag_type::{ExpectedFlagType, FlagType};
