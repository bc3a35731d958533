//! CLI command implementations.

pub mod search;
pub mod serve;
pub mod show;
pub mod status;
pub mod types;
