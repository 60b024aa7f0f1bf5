use anyhow::{Context, bail};
use pkg_constants::lease::{
    DEFAULT_EXPIRY_GRACE_SECS, DEFAULT_GC_PERIOD_SECS, DEFAULT_LEASE_SELECTOR, DEFAULT_NAMESPACE,
    REASON_UNKNOWN, STATUS_OK, STATUS_UNKNOWN,
};
use pkg_metrics::LeaseGcMetrics;
use pkg_state::{ApiStatus, LeaseClient, Precondition, StoreError};
use pkg_types::clock::Clock;
use pkg_types::lease::{Lease, is_lease_valid_with_grace};
use pkg_types::selector::LabelSelector;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Settings for one lease GC controller instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseGcConfig {
    /// Namespace the injected client is scoped to. Used for logging.
    pub namespace: String,
    /// Store-side label selector limiting GC to leases this controller owns.
    pub label_selector: String,
    /// Interval between GC passes.
    pub gc_period: Duration,
    /// Extra time past expiry before a lease is collected.
    pub expiry_grace: Duration,
}

impl Default for LeaseGcConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            label_selector: DEFAULT_LEASE_SELECTOR.to_string(),
            gc_period: Duration::from_secs(DEFAULT_GC_PERIOD_SECS),
            expiry_grace: Duration::from_secs(DEFAULT_EXPIRY_GRACE_SECS),
        }
    }
}

/// Outcome counts of a single GC pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcPassReport {
    /// Leases returned by the list call.
    pub listed: usize,
    /// Leases found expired.
    pub expired: usize,
    /// Expired leases this pass deleted.
    pub culled: usize,
    /// Expired leases that were gone by the time we deleted them.
    pub already_gone: usize,
    /// Deletes rejected by a precondition or that otherwise failed.
    pub failed: usize,
    /// The list call failed and the pass was abandoned.
    pub list_failed: bool,
}

/// Background controller that deletes expired leases from a shared store.
///
/// Deletes carry the resource version observed at list time, so a lease
/// renewed by its owner between list and delete is rejected by the store
/// and simply re-evaluated on the next pass.
pub struct LeaseGcController {
    clock: Arc<dyn Clock>,
    client: Arc<dyn LeaseClient>,
    metrics: Arc<dyn LeaseGcMetrics>,
    config: LeaseGcConfig,
    expiry_grace: chrono::Duration,
}

impl LeaseGcController {
    pub fn new(
        clock: Arc<dyn Clock>,
        client: Arc<dyn LeaseClient>,
        metrics: Arc<dyn LeaseGcMetrics>,
        config: LeaseGcConfig,
    ) -> anyhow::Result<Self> {
        if config.gc_period.is_zero() {
            bail!("lease GC period must be greater than zero");
        }
        LabelSelector::parse(&config.label_selector)
            .with_context(|| format!("invalid lease selector '{}'", config.label_selector))?;
        let expiry_grace = chrono::Duration::from_std(config.expiry_grace)
            .context("lease expiry grace is out of range")?;

        Ok(Self {
            clock,
            client,
            metrics,
            config,
            expiry_grace,
        })
    }

    pub fn config(&self) -> &LeaseGcConfig {
        &self.config
    }

    /// Start the controller loop as a background task.
    pub fn start(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Run GC passes on a fixed-rate ticker until `cancel` fires.
    ///
    /// The first pass runs immediately. A pass that overruns the period
    /// delays nothing but the ticks it covered; those are skipped, never
    /// replayed in a burst.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "LeaseGcController started (namespace={}, selector={}, interval={}s, grace={}s)",
            self.config.namespace,
            self.config.label_selector,
            self.config.gc_period.as_secs_f64(),
            self.config.expiry_grace.as_secs()
        );

        let mut interval = tokio::time::interval(self.config.gc_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let report = self.gc_pass(&cancel).await;
                    debug!(
                        "Lease GC pass: listed={} expired={} culled={} already_gone={} failed={} list_failed={}",
                        report.listed,
                        report.expired,
                        report.culled,
                        report.already_gone,
                        report.failed,
                        report.list_failed
                    );
                }
            }
        }

        info!("LeaseGcController stopped (namespace={})", self.config.namespace);
    }

    /// One pass: list leases, then conditionally delete every expired one.
    /// Never fails; every problem is logged and reported to telemetry.
    pub async fn gc_pass(&self, cancel: &CancellationToken) -> GcPassReport {
        let mut report = GcPassReport::default();
        if cancel.is_cancelled() {
            return report;
        }

        let start = Instant::now();
        let listed = self.client.list(&self.config.label_selector).await;
        let latency = start.elapsed();

        let leases = match listed {
            Ok(leases) => {
                self.metrics.observe_lease_list(STATUS_OK, "");
                self.metrics.observe_lease_list_latency(STATUS_OK, latency);
                leases
            }
            Err(e) => {
                error!("Could not list leases to garbage collect: {}", e);
                let status = decode_status("list", &e);
                self.metrics.observe_lease_list(status.code, &status.reason);
                self.metrics.observe_lease_list_latency(status.code, latency);
                report.list_failed = true;
                return report;
            }
        };
        report.listed = leases.len();

        for lease in &leases {
            if is_lease_valid_with_grace(self.clock.as_ref(), lease, self.expiry_grace) {
                continue;
            }
            report.expired += 1;

            if cancel.is_cancelled() {
                debug!("Lease GC cancelled, leaving remaining expired leases for later");
                break;
            }
            self.cull(lease, &mut report).await;
        }

        report
    }

    async fn cull(&self, lease: &Lease, report: &mut GcPassReport) {
        // Only delete the version we judged expired; a renewal bumps it.
        let precondition = Precondition::resource_version(&lease.resource_version);

        let start = Instant::now();
        let result = self.client.delete(&lease.name, &precondition).await;
        let latency = start.elapsed();

        match result {
            Ok(()) => {
                info!(
                    "Culled expired lease {} (holder={}, renewed={})",
                    lease.name,
                    lease.holder_identity.as_deref().unwrap_or("<none>"),
                    lease
                        .renew_time
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
                self.metrics.observe_lease_delete(STATUS_OK, "");
                self.metrics.observe_lease_delete_latency(STATUS_OK, latency);
                self.metrics.culled_leases_inc();
                report.culled += 1;
            }
            Err(e) if e.is_not_found() => {
                debug!("Lease {} was already deleted", lease.name);
                report.already_gone += 1;
            }
            Err(e) => {
                if e.is_conflict() {
                    warn!(
                        "Lease {} changed since it was listed, leaving it for the next pass: {}",
                        lease.name, e
                    );
                } else {
                    error!("Could not delete lease {}: {}", lease.name, e);
                }
                let status = decode_status("delete", &e);
                self.metrics.observe_lease_delete(status.code, &status.reason);
                self.metrics
                    .observe_lease_delete_latency(status.code, latency);
                report.failed += 1;
            }
        }
    }
}

/// Status to report for a failed store call, falling back to the
/// `Unknown` sentinel when the error exposes none.
fn decode_status(call: &str, err: &StoreError) -> ApiStatus {
    err.status().unwrap_or_else(|| {
        warn!(
            "Lease {} error has no status, recording it as {} {}: {}",
            call, STATUS_UNKNOWN, REASON_UNKNOWN, err
        );
        ApiStatus::new(STATUS_UNKNOWN, REASON_UNKNOWN)
    })
}
