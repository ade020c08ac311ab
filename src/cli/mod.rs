//! CLI command implementations

pub mod activity;
pub mod aggregate;
pub mod dashboard;
pub mod fleet;
pub mod seed;
