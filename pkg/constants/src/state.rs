//! State store key layout.

/// etcd-style prefix under which leases are stored.
/// Full key = `LEASE_KEY_PREFIX + namespace + "/" + name`.
pub const LEASE_KEY_PREFIX: &str = "/registry/leases/";

/// Key holding the last resource version handed out by the lease store.
pub const LEASE_REVISION_KEY: &str = "/registry/leases-revision";
