//! Centralized constants for the lease garbage collector.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod lease;
pub mod metrics;
pub mod paths;
pub mod state;
