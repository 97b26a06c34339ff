// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::collections::identifiable::Id;
use crate::internal::StackTrace as InternalStackTrace;

// For owned values - forward to reference version
impl From<InternalStackTrace> for datadog_profiling_otel::Stack {
    fn from(internal_stack_trace: InternalStackTrace) -> Self {
        Self::from(&internal_stack_trace)
    }
}

// For references (existing implementation)
impl From<&InternalStackTrace> for datadog_profiling_otel::Stack {
    fn from(internal_stack_trace: &InternalStackTrace) -> Self {
        Self {
            location_indices: internal_stack_trace
                .locations
                .iter()
                .map(|location_id| location_id.to_raw_id() as i32)
                .collect(),
        }
    }
}
