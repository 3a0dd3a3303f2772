//! CLI command implementations

pub mod apply;
pub mod filters;
pub mod probe;
