//! Metric names and label keys exported by the lease GC.

pub const LEASE_LIST_TOTAL: &str = "lease_gc_list_total";
pub const LEASE_LIST_LATENCY_SECONDS: &str = "lease_gc_list_latency_seconds";
pub const LEASE_DELETE_TOTAL: &str = "lease_gc_delete_total";
pub const LEASE_DELETE_LATENCY_SECONDS: &str = "lease_gc_delete_latency_seconds";
pub const CULLED_LEASES_TOTAL: &str = "lease_gc_culled_leases_total";

/// Label carrying the status code of a store call.
pub const LABEL_STATUS_CODE: &str = "http_status_code";

/// Label carrying the status reason of a store call.
pub const LABEL_REASON: &str = "reason";

/// Latency histogram buckets, in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.025, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];
