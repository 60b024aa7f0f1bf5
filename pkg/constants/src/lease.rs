//! Lease GC defaults and status sentinels.

/// Namespace whose leases are garbage collected when none is configured.
pub const DEFAULT_NAMESPACE: &str = "kube-system";

/// Label selector scoping GC to leases owned by proxy server replicas.
pub const DEFAULT_LEASE_SELECTOR: &str = "k8s-app=konnectivity-server";

/// How often a GC pass runs, in seconds.
pub const DEFAULT_GC_PERIOD_SECS: u64 = 15;

/// Extra time past `renew_time + duration` before a lease is collected.
/// Zero keeps the strict expiry comparison.
pub const DEFAULT_EXPIRY_GRACE_SECS: u64 = 0;

// ─── Status codes reported to telemetry ────────────────────────────────────

/// Code reported for every successful list/delete call.
pub const STATUS_OK: u16 = 200;

/// Code reported when a store error carries no structured status.
pub const STATUS_UNKNOWN: u16 = 0;

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_INVALID: u16 = 422;

// ─── Status reasons ────────────────────────────────────────────────────────

pub const REASON_UNKNOWN: &str = "Unknown";
pub const REASON_NOT_FOUND: &str = "NotFound";
pub const REASON_CONFLICT: &str = "Conflict";
pub const REASON_ALREADY_EXISTS: &str = "AlreadyExists";
pub const REASON_BAD_REQUEST: &str = "BadRequest";
pub const REASON_INVALID: &str = "Invalid";
