//! Lease store access: the client contract consumed by the GC controller,
//! its error taxonomy, and the in-memory and SlateDB-backed stores.

pub mod client;
pub mod error;
pub mod lease;
pub mod memory;
pub mod slate;

pub use error::{ApiStatus, StoreError};
pub use lease::{LeaseClient, Precondition};
pub use memory::MemoryLeaseStore;
pub use slate::SlateLeaseStore;
