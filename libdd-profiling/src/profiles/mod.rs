// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod collections;
mod compressor;
pub mod datatypes;

pub use compressor::*;
