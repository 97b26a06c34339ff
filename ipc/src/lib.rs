// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod example_interface;
pub mod handles;
pub mod transport;

pub mod platform;
pub mod rate_limiter;
pub mod sequential;

pub use tarpc;
