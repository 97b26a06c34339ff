// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod aggregator;
pub mod constants;
pub mod datadog;
pub mod dogstatsd;
pub mod errors;
pub mod flusher;
pub mod metric;
