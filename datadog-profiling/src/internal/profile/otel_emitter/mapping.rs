// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::collections::identifiable::Id;
use crate::internal::Mapping as InternalMapping;

// For owned values - forward to reference version
impl From<InternalMapping> for datadog_profiling_otel::Mapping {
    fn from(internal_mapping: InternalMapping) -> Self {
        Self::from(&internal_mapping)
    }
}

// For references (existing implementation)
impl From<&InternalMapping> for datadog_profiling_otel::Mapping {
    fn from(internal_mapping: &InternalMapping) -> Self {
        Self {
            memory_start: internal_mapping.memory_start,
            memory_limit: internal_mapping.memory_limit,
            file_offset: internal_mapping.file_offset,
            filename_strindex: internal_mapping.filename.to_raw_id() as i32,
            attribute_indices: vec![], // Not available in internal Mapping
            has_functions: true,       // Assume true since we have function information
            has_filenames: true,       // Assume true since we have filename
            has_line_numbers: true,    // Assume true since we have line information
            has_inline_frames: false,  // Not available in internal Mapping
        }
    }
}
