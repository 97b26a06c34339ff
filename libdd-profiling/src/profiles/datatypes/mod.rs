// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod function;
mod mapping;
mod profiles_dictionary;
mod string;

pub use function::*;
pub use mapping::*;
pub use profiles_dictionary::*;
pub use string::*;
