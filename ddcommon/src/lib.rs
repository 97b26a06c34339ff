// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod azure_app_services;
pub mod entity_id;
#[macro_use]
pub mod cstr;
pub mod config;
pub mod rate_limiter;
pub mod tag;
