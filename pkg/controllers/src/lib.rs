//! Background controllers.

pub mod lease_gc;

pub use lease_gc::{GcPassReport, LeaseGcConfig, LeaseGcController};
