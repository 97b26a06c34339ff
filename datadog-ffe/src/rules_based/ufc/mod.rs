//! Universal Flag Configuration.
mod assignment;
mod compiled_flag_config;
mod models;

pub use assignment::{Assignment, AssignmentReason, AssignmentValue};
pub use compiled_flag_config::*;
pub use models::*;
