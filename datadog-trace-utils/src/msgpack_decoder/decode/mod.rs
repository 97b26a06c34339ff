// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod error;
pub mod map;
pub mod meta_struct;
pub mod metrics;
pub mod number;
pub mod span_event;
pub mod span_link;
pub mod string;
