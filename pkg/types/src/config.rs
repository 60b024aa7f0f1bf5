use serde::{Deserialize, Serialize};

/// Lease GC configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// namespace: kube-system
/// lease-selector: k8s-app=konnectivity-server
/// gc-period-secs: 15
/// expiry-grace-secs: 0
/// data-dir: /var/lib/lease-gc
/// metrics-port: 8095
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaseGcConfigFile {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, alias = "lease-selector")]
    pub lease_selector: Option<String>,
    #[serde(default, alias = "gc-period-secs")]
    pub gc_period_secs: Option<u64>,
    #[serde(default, alias = "expiry-grace-secs")]
    pub expiry_grace_secs: Option<u64>,
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default, alias = "metrics-port")]
    pub metrics_port: Option<u16>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}
