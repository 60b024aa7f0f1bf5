use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pkg_constants::state::{LEASE_KEY_PREFIX, LEASE_REVISION_KEY};
use pkg_types::lease::Lease;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::client::StateStore;
use crate::error::StoreError;
use crate::lease::{LeaseClient, Precondition, admit_new_lease, already_exists, parse_selector};

/// Lease store persisted in SlateDB under `/registry/leases/<namespace>/<name>`.
///
/// SlateDB has no compare-and-swap, so all mutations go through one async
/// mutex. Preconditions are therefore atomic only among writers sharing
/// this handle (clones included).
#[derive(Clone)]
pub struct SlateLeaseStore {
    store: StateStore,
    namespace: String,
    write_lock: Arc<Mutex<()>>,
}

impl SlateLeaseStore {
    pub fn new(store: StateStore, namespace: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn prefix(&self) -> String {
        format!("{}{}/", LEASE_KEY_PREFIX, self.namespace)
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }

    /// Bump and persist the store-wide revision. Caller holds `write_lock`.
    async fn next_version(&self) -> Result<String, StoreError> {
        let current: u64 = self.store.get_json(LEASE_REVISION_KEY).await?.unwrap_or(0);
        let next = current + 1;
        self.store.put_json(LEASE_REVISION_KEY, &next).await?;
        Ok(next.to_string())
    }

    pub async fn get(&self, name: &str) -> Result<Option<Lease>, StoreError> {
        Ok(self.store.get_json(&self.key(name)).await?)
    }

    pub async fn create(&self, mut lease: Lease) -> Result<Lease, StoreError> {
        admit_new_lease(&self.namespace, &mut lease)?;
        let _guard = self.write_lock.lock().await;
        let key = self.key(&lease.name);
        if self.store.get(&key).await?.is_some() {
            return Err(already_exists(&lease.name));
        }
        lease.resource_version = self.next_version().await?;
        self.store.put_json(&key, &lease).await?;
        Ok(lease)
    }

    pub async fn renew(
        &self,
        name: &str,
        renew_time: DateTime<Utc>,
        precondition: &Precondition,
    ) -> Result<Lease, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut lease = self.get(name).await?.ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })?;
        precondition.check(&lease)?;
        lease.renew_time = Some(renew_time);
        lease.resource_version = self.next_version().await?;
        self.store.put_json(&self.key(name), &lease).await?;
        Ok(lease)
    }
}

#[async_trait]
impl LeaseClient for SlateLeaseStore {
    async fn list(&self, label_selector: &str) -> Result<Vec<Lease>, StoreError> {
        let selector = parse_selector(label_selector)?;
        let entries = self.store.list_prefix(&self.prefix()).await?;

        let mut leases = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let lease: Lease = match serde_json::from_slice(&value) {
                Ok(l) => l,
                Err(e) => {
                    warn!("Skipping unreadable lease record {}: {}", key, e);
                    continue;
                }
            };
            if selector.matches(&lease.labels) {
                leases.push(lease);
            }
        }
        Ok(leases)
    }

    async fn delete(&self, name: &str, precondition: &Precondition) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let stored = self.get(name).await?.ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })?;
        precondition.check(&stored)?;
        // Bump first: once the key is gone the delete must report success.
        self.next_version().await?;
        self.store.delete(&self.key(name)).await?;
        Ok(())
    }
}
