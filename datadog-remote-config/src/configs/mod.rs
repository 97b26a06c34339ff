// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod dynamic_configuration;
mod flare_configuration;

pub use dynamic_configuration::*;
pub use flare_configuration::*;
