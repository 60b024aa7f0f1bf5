use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pkg_types::lease::Lease;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::lease::{LeaseClient, Precondition, admit_new_lease, already_exists, parse_selector};

/// In-memory versioned lease store for a single namespace.
/// Every mutation bumps a store-wide revision that becomes the lease's
/// `resource_version`, mirroring how an API server hands out versions.
#[derive(Clone)]
pub struct MemoryLeaseStore {
    namespace: String,
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    revision: u64,
    leases: BTreeMap<String, Lease>,
}

impl MemoryInner {
    fn next_version(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }
}

impl MemoryLeaseStore {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            inner: Arc::new(RwLock::new(MemoryInner::default())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create a lease, returning it with its assigned resource version.
    pub async fn create(&self, mut lease: Lease) -> Result<Lease, StoreError> {
        admit_new_lease(&self.namespace, &mut lease)?;
        let mut inner = self.inner.write().await;
        if inner.leases.contains_key(&lease.name) {
            return Err(already_exists(&lease.name));
        }
        lease.resource_version = inner.next_version();
        inner.leases.insert(lease.name.clone(), lease.clone());
        Ok(lease)
    }

    /// Renew a lease as its owner would, bumping its resource version.
    pub async fn renew(
        &self,
        name: &str,
        renew_time: DateTime<Utc>,
        precondition: &Precondition,
    ) -> Result<Lease, StoreError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let Some(lease) = inner.leases.get_mut(name) else {
            return Err(StoreError::NotFound {
                name: name.to_string(),
            });
        };
        precondition.check(lease)?;
        inner.revision += 1;
        lease.renew_time = Some(renew_time);
        lease.resource_version = inner.revision.to_string();
        Ok(lease.clone())
    }

    pub async fn get(&self, name: &str) -> Option<Lease> {
        self.inner.read().await.leases.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.leases.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LeaseClient for MemoryLeaseStore {
    async fn list(&self, label_selector: &str) -> Result<Vec<Lease>, StoreError> {
        let selector = parse_selector(label_selector)?;
        let inner = self.inner.read().await;
        Ok(inner
            .leases
            .values()
            .filter(|l| selector.matches(&l.labels))
            .cloned()
            .collect())
    }

    async fn delete(&self, name: &str, precondition: &Precondition) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.leases.get(name) {
            Some(stored) => precondition.check(stored)?,
            None => {
                return Err(StoreError::NotFound {
                    name: name.to_string(),
                });
            }
        }
        inner.leases.remove(name);
        // Deletions are mutations too.
        inner.next_version();
        Ok(())
    }
}
