// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#[cfg(all(unix, feature = "crashtracker-collector"))]
mod collector;
mod crash_info;
mod datatypes;
mod demangler;
#[cfg(all(unix, feature = "crashtracker-receiver"))]
mod receiver;

#[cfg(all(unix, feature = "crashtracker-collector"))]
pub use collector::*;
pub use crash_info::*;
pub use datatypes::*;
pub use demangler::*;
#[cfg(all(unix, feature = "crashtracker-receiver"))]
pub use receiver::*;
