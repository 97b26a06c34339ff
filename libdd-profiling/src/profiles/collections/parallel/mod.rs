// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod set;
mod sharded;
mod slice_set;
mod string_set;

pub use set::*;
pub use sharded::*;
pub use slice_set::*;
pub use string_set::*;
