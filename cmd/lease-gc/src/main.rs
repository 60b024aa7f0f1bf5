mod server;

use clap::Parser;
use pkg_constants::lease::{
    DEFAULT_EXPIRY_GRACE_SECS, DEFAULT_GC_PERIOD_SECS, DEFAULT_LEASE_SELECTOR, DEFAULT_NAMESPACE,
};
use pkg_constants::paths::{DEFAULT_CONFIG, DEFAULT_DATA_DIR, DEFAULT_METRICS_PORT};
use pkg_controllers::{LeaseGcConfig, LeaseGcController};
use pkg_metrics::{LeaseGcRecorder, MetricsRegistry};
use pkg_state::SlateLeaseStore;
use pkg_state::client::StateStore;
use pkg_types::clock::SystemClock;
use pkg_types::config::{LeaseGcConfigFile, load_config_file};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lease-gc", about = "Garbage collector for expired proxy server leases")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Namespace whose leases are collected
    #[arg(long)]
    namespace: Option<String>,

    /// Label selector scoping GC to leases owned by this deployment
    #[arg(long)]
    lease_selector: Option<String>,

    /// Seconds between GC passes
    #[arg(long)]
    gc_period_secs: Option<u64>,

    /// Extra seconds past expiry before a lease is collected
    #[arg(long)]
    expiry_grace_secs: Option<u64>,

    /// Directory for SlateDB lease storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Port serving /metrics and /healthz
    #[arg(long)]
    metrics_port: Option<u16>,
}

/// Effective settings after merging CLI args > config file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    gc: LeaseGcConfig,
    data_dir: String,
    metrics_port: u16,
}

impl Settings {
    fn resolve(cli: Cli, file: LeaseGcConfigFile) -> Self {
        let gc_period_secs = cli
            .gc_period_secs
            .or(file.gc_period_secs)
            .unwrap_or(DEFAULT_GC_PERIOD_SECS);
        let expiry_grace_secs = cli
            .expiry_grace_secs
            .or(file.expiry_grace_secs)
            .unwrap_or(DEFAULT_EXPIRY_GRACE_SECS);

        Self {
            gc: LeaseGcConfig {
                namespace: cli
                    .namespace
                    .or(file.namespace)
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
                label_selector: cli
                    .lease_selector
                    .or(file.lease_selector)
                    .unwrap_or_else(|| DEFAULT_LEASE_SELECTOR.to_string()),
                gc_period: Duration::from_secs(gc_period_secs),
                expiry_grace: Duration::from_secs(expiry_grace_secs),
            },
            data_dir: cli
                .data_dir
                .or(file.data_dir)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            metrics_port: cli
                .metrics_port
                .or(file.metrics_port)
                .unwrap_or(DEFAULT_METRICS_PORT),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: LeaseGcConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);
    let settings = Settings::resolve(cli, file_cfg);

    info!("Starting lease-gc");
    info!("  Namespace:     {}", settings.gc.namespace);
    info!("  Selector:      {}", settings.gc.label_selector);
    info!("  GC period:     {}s", settings.gc.gc_period.as_secs());
    info!("  Expiry grace:  {}s", settings.gc.expiry_grace.as_secs());
    info!("  Data dir:      {}", settings.data_dir);
    info!("  Metrics port:  {}", settings.metrics_port);

    let state = StateStore::new(&settings.data_dir).await?;
    let leases = Arc::new(SlateLeaseStore::new(state.clone(), &settings.gc.namespace));
    let registry = Arc::new(MetricsRegistry::new());
    let recorder = Arc::new(LeaseGcRecorder::new(registry.clone()));
    let controller = LeaseGcController::new(Arc::new(SystemClock), leases, recorder, settings.gc)?;

    let cancel = CancellationToken::new();
    let gc_task = controller.start(cancel.clone());
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], settings.metrics_port));
    let mut metrics_task = tokio::spawn(server::serve(metrics_addr, registry, cancel.clone()));

    let mut metrics_finished = false;
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received interrupt, shutting down");
        }
        result = &mut metrics_task => {
            metrics_finished = true;
            match result {
                Ok(Ok(())) => info!("Metrics server exited, shutting down"),
                Ok(Err(e)) => error!("Metrics server failed: {}", e),
                Err(e) => error!("Metrics server task panicked: {}", e),
            }
        }
    }

    cancel.cancel();
    gc_task.await?;
    if !metrics_finished {
        metrics_task.await??;
    }
    state.close().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["lease-gc"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_apply_without_flags_or_file() {
        let settings = Settings::resolve(cli(&[]), LeaseGcConfigFile::default());
        assert_eq!(settings.gc, LeaseGcConfig::default());
        assert_eq!(settings.data_dir, DEFAULT_DATA_DIR);
        assert_eq!(settings.metrics_port, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let file = LeaseGcConfigFile {
            namespace: Some("konnectivity".to_string()),
            lease_selector: Some("app=proxy".to_string()),
            gc_period_secs: Some(30),
            expiry_grace_secs: Some(5),
            data_dir: Some("/var/lib/lease-gc".to_string()),
            metrics_port: Some(9100),
        };
        let settings = Settings::resolve(
            cli(&["--gc-period-secs", "60", "--metrics-port", "9200"]),
            file,
        );

        assert_eq!(settings.gc.namespace, "konnectivity");
        assert_eq!(settings.gc.label_selector, "app=proxy");
        assert_eq!(settings.gc.gc_period, Duration::from_secs(60));
        assert_eq!(settings.gc.expiry_grace, Duration::from_secs(5));
        assert_eq!(settings.data_dir, "/var/lib/lease-gc");
        assert_eq!(settings.metrics_port, 9200);
    }

    #[test]
    fn test_config_path_defaults() {
        assert_eq!(cli(&[]).config, DEFAULT_CONFIG);
        assert_eq!(cli(&["-c", "/tmp/gc.yaml"]).config, "/tmp/gc.yaml");
    }
}
