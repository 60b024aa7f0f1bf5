//! Shared types for the lease garbage collector.

pub mod clock;
pub mod config;
pub mod lease;
pub mod selector;
pub mod validate;
