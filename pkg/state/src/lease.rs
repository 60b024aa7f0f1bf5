use async_trait::async_trait;
use pkg_constants::lease::{REASON_ALREADY_EXISTS, REASON_INVALID, STATUS_CONFLICT, STATUS_INVALID};
use pkg_types::lease::Lease;
use pkg_types::selector::LabelSelector;
use pkg_types::validate::validate_name;

use crate::error::StoreError;

/// Condition a delete must satisfy against the stored lease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    /// Required current resource version. `None` deletes unconditionally.
    pub resource_version: Option<String>,
}

impl Precondition {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn resource_version(rv: &str) -> Self {
        Self {
            resource_version: Some(rv.to_string()),
        }
    }

    /// Check the precondition against the stored lease.
    pub fn check(&self, stored: &Lease) -> Result<(), StoreError> {
        match &self.resource_version {
            Some(expected) if *expected != stored.resource_version => Err(StoreError::Conflict {
                name: stored.name.clone(),
                expected: expected.clone(),
                actual: stored.resource_version.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Client for a namespaced, versioned lease store shared with lease owners.
#[async_trait]
pub trait LeaseClient: Send + Sync {
    /// List leases whose labels match `label_selector`.
    async fn list(&self, label_selector: &str) -> Result<Vec<Lease>, StoreError>;

    /// Delete the lease `name` if `precondition` holds.
    async fn delete(&self, name: &str, precondition: &Precondition) -> Result<(), StoreError>;
}

pub(crate) fn parse_selector(selector: &str) -> Result<LabelSelector, StoreError> {
    LabelSelector::parse(selector).map_err(|e| StoreError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Validate a lease about to be created in `namespace`, filling in the
/// namespace when the caller left it empty.
pub(crate) fn admit_new_lease(namespace: &str, lease: &mut Lease) -> Result<(), StoreError> {
    validate_name(&lease.name)
        .map_err(|e| StoreError::status_error(STATUS_INVALID, REASON_INVALID, e.to_string()))?;
    if lease.namespace.is_empty() {
        lease.namespace = namespace.to_string();
    } else if lease.namespace != namespace {
        return Err(StoreError::status_error(
            STATUS_INVALID,
            REASON_INVALID,
            format!(
                "lease {} targets namespace {} but the store serves {}",
                lease.name, lease.namespace, namespace
            ),
        ));
    }
    Ok(())
}

pub(crate) fn already_exists(name: &str) -> StoreError {
    StoreError::status_error(
        STATUS_CONFLICT,
        REASON_ALREADY_EXISTS,
        format!("lease {} already exists", name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_check() {
        let mut lease = Lease::new("kube-system", "l1");
        lease.resource_version = "7".to_string();

        assert!(Precondition::none().check(&lease).is_ok());
        assert!(Precondition::resource_version("7").check(&lease).is_ok());

        let err = Precondition::resource_version("6").check(&lease).unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("expected resource version 6, found 7"));
    }

    #[test]
    fn test_parse_selector_maps_to_bad_request() {
        assert!(parse_selector("k8s-app=konnectivity-server").is_ok());
        let err = parse_selector("a=1,,b").unwrap_err();
        assert_eq!(err.status().unwrap().code, 400);
    }

    #[test]
    fn test_admit_new_lease() {
        let mut lease = Lease::new("", "server-1");
        admit_new_lease("kube-system", &mut lease).unwrap();
        assert_eq!(lease.namespace, "kube-system");

        let mut foreign = Lease::new("default", "server-2");
        assert_eq!(
            admit_new_lease("kube-system", &mut foreign)
                .unwrap_err()
                .status()
                .unwrap()
                .code,
            422
        );

        let mut bad_name = Lease::new("kube-system", "Server_1");
        assert!(admit_new_lease("kube-system", &mut bad_name).is_err());
    }
}
