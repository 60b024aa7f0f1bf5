//! Filesystem path constants.

/// Default config file path for the lease GC.
pub const DEFAULT_CONFIG: &str = "/etc/lease-gc/config.yaml";

/// Default data directory for the SlateDB lease store.
pub const DEFAULT_DATA_DIR: &str = "/tmp/lease-gc-data";

/// Default port for the `/metrics` and `/healthz` endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 8095;
