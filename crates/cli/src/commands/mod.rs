//! Command implementations

pub mod analyze;
