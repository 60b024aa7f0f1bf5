use pkg_constants::metrics::{
    CULLED_LEASES_TOTAL, LABEL_REASON, LABEL_STATUS_CODE, LATENCY_BUCKETS,
    LEASE_DELETE_LATENCY_SECONDS, LEASE_DELETE_TOTAL, LEASE_LIST_LATENCY_SECONDS,
    LEASE_LIST_TOTAL,
};
use std::sync::Arc;
use std::time::Duration;

use crate::MetricsRegistry;

/// Telemetry sink for the lease garbage collector.
///
/// Implementations are shared across tasks and must tolerate concurrent calls.
pub trait LeaseGcMetrics: Send + Sync {
    fn observe_lease_list(&self, code: u16, reason: &str);
    fn observe_lease_list_latency(&self, code: u16, latency: Duration);
    fn observe_lease_delete(&self, code: u16, reason: &str);
    fn observe_lease_delete_latency(&self, code: u16, latency: Duration);
    fn culled_leases_inc(&self);
}

/// `LeaseGcMetrics` backed by a shared [`MetricsRegistry`].
#[derive(Clone)]
pub struct LeaseGcRecorder {
    registry: Arc<MetricsRegistry>,
}

impl LeaseGcRecorder {
    /// Register the lease GC metric families on `registry`.
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        registry.register_counter_vec(
            LEASE_LIST_TOTAL,
            "Lease list calls by status code and reason",
            &[LABEL_STATUS_CODE, LABEL_REASON],
        );
        registry.register_histogram_vec(
            LEASE_LIST_LATENCY_SECONDS,
            "Latency of lease list calls in seconds",
            &[LABEL_STATUS_CODE],
            LATENCY_BUCKETS,
        );
        registry.register_counter_vec(
            LEASE_DELETE_TOTAL,
            "Lease delete calls by status code and reason",
            &[LABEL_STATUS_CODE, LABEL_REASON],
        );
        registry.register_histogram_vec(
            LEASE_DELETE_LATENCY_SECONDS,
            "Latency of lease delete calls in seconds",
            &[LABEL_STATUS_CODE],
            LATENCY_BUCKETS,
        );
        registry.register_counter(CULLED_LEASES_TOTAL, "Expired leases deleted by the GC");
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }
}

impl LeaseGcMetrics for LeaseGcRecorder {
    fn observe_lease_list(&self, code: u16, reason: &str) {
        self.registry
            .counter_vec_inc(LEASE_LIST_TOTAL, &[code.to_string().as_str(), reason]);
    }

    fn observe_lease_list_latency(&self, code: u16, latency: Duration) {
        self.registry.histogram_observe(
            LEASE_LIST_LATENCY_SECONDS,
            &[code.to_string().as_str()],
            latency.as_secs_f64(),
        );
    }

    fn observe_lease_delete(&self, code: u16, reason: &str) {
        self.registry
            .counter_vec_inc(LEASE_DELETE_TOTAL, &[code.to_string().as_str(), reason]);
    }

    fn observe_lease_delete_latency(&self, code: u16, latency: Duration) {
        self.registry.histogram_observe(
            LEASE_DELETE_LATENCY_SECONDS,
            &[code.to_string().as_str()],
            latency.as_secs_f64(),
        );
    }

    fn culled_leases_inc(&self) {
        self.registry.counter_inc(CULLED_LEASES_TOTAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_populates_registry() {
        let registry = Arc::new(MetricsRegistry::new());
        let recorder = LeaseGcRecorder::new(registry.clone());

        recorder.observe_lease_list(200, "");
        recorder.observe_lease_list_latency(200, Duration::from_millis(3));
        recorder.observe_lease_delete(409, "Conflict");
        recorder.observe_lease_delete_latency(409, Duration::from_millis(40));
        recorder.culled_leases_inc();
        recorder.culled_leases_inc();

        assert_eq!(registry.counter_vec_value(LEASE_LIST_TOTAL, &["200", ""]), Some(1));
        assert_eq!(
            registry.histogram_count(LEASE_LIST_LATENCY_SECONDS, &["200"]),
            Some(1)
        );
        assert_eq!(
            registry.counter_vec_value(LEASE_DELETE_TOTAL, &["409", "Conflict"]),
            Some(1)
        );
        assert_eq!(
            registry.histogram_count(LEASE_DELETE_LATENCY_SECONDS, &["409"]),
            Some(1)
        );
        assert_eq!(registry.counter_value(CULLED_LEASES_TOTAL), Some(2));

        let out = registry.render();
        assert!(out.contains("lease_gc_culled_leases_total 2\n"));
        assert!(out.contains(
            "lease_gc_delete_total{http_status_code=\"409\",reason=\"Conflict\"} 1\n"
        ));
        assert!(out.contains(
            "lease_gc_list_latency_seconds_bucket{http_status_code=\"200\",le=\"0.005\"} 1\n"
        ));
    }

    #[test]
    fn test_recorders_share_registered_families() {
        let registry = Arc::new(MetricsRegistry::new());
        let first = LeaseGcRecorder::new(registry.clone());
        let second = LeaseGcRecorder::new(registry.clone());

        first.culled_leases_inc();
        second.culled_leases_inc();
        assert_eq!(registry.counter_value(CULLED_LEASES_TOTAL), Some(2));
    }
}
