// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod endpoint_stats;
mod endpoints;
mod label;
mod location;
mod observation;
mod profile;
mod sample;
mod stack_trace;
mod timestamp;
mod upscaling;

pub use endpoint_stats::*;
pub use endpoints::*;
pub use label::*;
pub use libdd_profiling_protobuf::ValueType;
pub use location::*;
pub use observation::*;
pub use profile::*;
pub use sample::*;
pub use stack_trace::*;
pub use timestamp::*;
pub use upscaling::*;

use crate::collections::identifiable::*;
use std::num::NonZeroU32;
