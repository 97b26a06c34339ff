// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! All the mess here will go away once https://github.com/open-telemetry/opentelemetry-proto/pull/672/files is merged.

use crate::collections::identifiable::Id;
use crate::internal::Label as InternalLabel;
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Converts a datadog-profiling internal Label to an OpenTelemetry KeyValue
///
/// # Arguments
/// * `label` - The internal label to convert
/// * `string_table` - A slice of strings where StringIds index into
/// * `key_to_unit_map` - A mutable map from key string index to unit string index for numeric
///   labels
///
/// # Returns
/// * `Ok(KeyValue)` if the conversion is successful
/// * `Err` with context if the StringIds are out of bounds of the string table
pub fn convert_label_to_key_value(
    label: &InternalLabel,
    string_table: &[String],
    key_to_unit_map: &mut HashMap<usize, usize>,
) -> Result<datadog_profiling_otel::KeyValue> {
    // Get the key string
    let key_id = label.get_key().to_raw_id() as usize;
    let key = string_table
        .get(key_id)
        .with_context(|| {
            format!(
                "Key string index {} out of bounds (string table has {} elements)",
                key_id,
                string_table.len()
            )
        })?
        .to_string();

    match label.get_value() {
        crate::internal::LabelValue::Str(str_id) => {
            let str_value_id = str_id.to_raw_id() as usize;
            let str_value = string_table
                .get(str_value_id)
                .with_context(|| {
                    format!(
                        "Value string index {} out of bounds (string table has {} elements)",
                        str_value_id,
                        string_table.len()
                    )
                })?
                .to_string();

            Ok(datadog_profiling_otel::KeyValue {
                key,
                value: Some(datadog_profiling_otel::key_value::Value::StringValue(
                    str_value,
                )),
            })
        }
        crate::internal::LabelValue::Num { num, num_unit } => {
            // Note: OpenTelemetry KeyValue doesn't support units, so we only store the numeric
            // value But we track the mapping for building the attribute_units table
            let key_index = label.get_key().to_raw_id() as usize;
            let unit_index = num_unit.to_raw_id() as usize;

            // Only add to the map if the unit is not the default empty string (index 0)
            if unit_index > 0 {
                key_to_unit_map.insert(key_index, unit_index);
            }

            Ok(datadog_profiling_otel::KeyValue {
                key,
                value: Some(datadog_profiling_otel::key_value::Value::IntValue(*num)),
            })
        }
    }
}
