// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod api;
mod builder;
mod crash_ping;
mod metadata;
mod os_info;
mod proc_info;
mod sig_info;
mod span;
mod stackframe;
mod stacktrace;
mod thread_data;

pub use api::*;
pub use builder::*;
pub use crash_ping::*;
pub use metadata::*;
pub use os_info::*;
pub use proc_info::*;
pub use sig_info::*;
pub use span::*;
pub use stackframe::*;
pub use stacktrace::*;
pub use thread_data::*;
