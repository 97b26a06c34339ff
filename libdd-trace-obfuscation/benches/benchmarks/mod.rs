// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod credit_cards_bench;
pub mod ip_address_bench;
pub mod redis_obfuscation_bench;
pub mod replace_trace_tags_bench;
pub mod sql_obfuscation_bench;
