// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2021-Present Datadog, Inc.

pub use ddprof_exporter as exporter;
pub use ddprof_ffi as ffi;
pub use ddprof_profiles as profiles;
