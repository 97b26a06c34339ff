// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2021-Present Datadog, Inc.

mod expr_defs;
mod expr_eval;
mod parse_json;
mod probe_defs;

pub mod debugger_defs;
pub mod sender;

pub use expr_eval::*;
pub use parse_json::parse as parse_json;
pub use probe_defs::*;
