use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::Clock;

/// A time-bounded claim held by a proxy server replica.
/// Owners create and renew leases; the GC controller only reads and
/// conditionally deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Unique name within `namespace`
    pub name: String,
    pub namespace: String,
    /// Identity of the replica holding this lease
    #[serde(default)]
    pub holder_identity: Option<String>,
    /// When the lease was first acquired
    #[serde(default)]
    pub acquire_time: Option<DateTime<Utc>>,
    /// When the lease was last renewed by its owner
    #[serde(default)]
    pub renew_time: Option<DateTime<Utc>>,
    /// Validity window measured from `renew_time`
    #[serde(default)]
    pub lease_duration_seconds: Option<i64>,
    /// Opaque version token assigned by the store on every mutation
    #[serde(default)]
    pub resource_version: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Lease {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            holder_identity: None,
            acquire_time: None,
            renew_time: None,
            lease_duration_seconds: None,
            resource_version: String::new(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_holder(mut self, holder: &str) -> Self {
        self.holder_identity = Some(holder.to_string());
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    /// Set both acquire and renew time to `at` with the given duration.
    pub fn renewed_at(mut self, at: DateTime<Utc>, duration_seconds: i64) -> Self {
        self.acquire_time.get_or_insert(at);
        self.renew_time = Some(at);
        self.lease_duration_seconds = Some(duration_seconds);
        self
    }

    /// Instant after which the lease is no longer valid.
    /// `None` when either the renew time or the duration is missing.
    /// Durations past the representable range saturate to the end of time.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let renew_time = self.renew_time?;
        let seconds = self.lease_duration_seconds?;
        let expiry = Duration::try_seconds(seconds)
            .and_then(|duration| renew_time.checked_add_signed(duration))
            .unwrap_or(if seconds > 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            });
        Some(expiry)
    }

    /// A lease is valid iff `now < renew_time + lease_duration_seconds`.
    /// Leases missing either field never count as valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expiry) => now < expiry,
            None => false,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid_at(now)
    }
}

/// Whether `lease` is still current according to `clock`.
pub fn is_lease_valid(clock: &dyn Clock, lease: &Lease) -> bool {
    lease.is_valid_at(clock.now())
}

/// Like [`is_lease_valid`], but keeps the lease valid for an extra `grace`
/// past its expiry to absorb clock skew between owners and the collector.
pub fn is_lease_valid_with_grace(clock: &dyn Clock, lease: &Lease, grace: Duration) -> bool {
    let Some(expiry) = lease.expires_at() else {
        return false;
    };
    match expiry.checked_add_signed(grace) {
        Some(deadline) => clock.now() < deadline,
        None => true,
    }
}
