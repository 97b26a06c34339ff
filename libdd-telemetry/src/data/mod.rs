// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;
mod payloads;

pub use common::*;
pub use payload::*;
pub use payloads::*;
pub mod metrics;
pub mod payload;
