use pkg_constants::lease::{
    REASON_BAD_REQUEST, REASON_CONFLICT, REASON_NOT_FOUND, STATUS_BAD_REQUEST, STATUS_CONFLICT,
    STATUS_NOT_FOUND,
};
use std::fmt;
use thiserror::Error;

/// Structured status carried by a store failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStatus {
    pub code: u16,
    pub reason: String,
}

impl ApiStatus {
    pub fn new(code: u16, reason: &str) -> Self {
        Self {
            code,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// Failure of a lease store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lease {name} not found")]
    NotFound { name: String },

    #[error(
        "precondition failed for lease {name}: expected resource version {expected}, found {actual}"
    )]
    Conflict {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("invalid label selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("{reason} ({code}): {message}")]
    Status {
        code: u16,
        reason: String,
        message: String,
    },

    /// Backend or transport failure with no status attached.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl StoreError {
    pub fn status_error(code: u16, reason: &str, message: impl Into<String>) -> Self {
        StoreError::Status {
            code,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    /// Structured status for this failure, if it exposes one.
    pub fn status(&self) -> Option<ApiStatus> {
        match self {
            StoreError::NotFound { .. } => Some(ApiStatus::new(STATUS_NOT_FOUND, REASON_NOT_FOUND)),
            StoreError::Conflict { .. } => Some(ApiStatus::new(STATUS_CONFLICT, REASON_CONFLICT)),
            StoreError::InvalidSelector { .. } => {
                Some(ApiStatus::new(STATUS_BAD_REQUEST, REASON_BAD_REQUEST))
            }
            StoreError::Status { code, reason, .. } => Some(ApiStatus::new(*code, reason)),
            StoreError::Transport(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Status { code, .. } => *code == STATUS_NOT_FOUND,
            _ => false,
        }
    }

    /// True when a precondition on the resource version was rejected.
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::Conflict { .. } => true,
            StoreError::Status { code, .. } => *code == STATUS_CONFLICT,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_variants_expose_status() {
        let not_found = StoreError::NotFound {
            name: "l1".to_string(),
        };
        assert_eq!(not_found.status(), Some(ApiStatus::new(404, "NotFound")));
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = StoreError::Conflict {
            name: "l1".to_string(),
            expected: "3".to_string(),
            actual: "4".to_string(),
        };
        assert_eq!(conflict.status().unwrap().code, 409);
        assert!(conflict.is_conflict());

        let unavailable = StoreError::status_error(503, "ServiceUnavailable", "etcd timeout");
        assert_eq!(
            unavailable.status(),
            Some(ApiStatus::new(503, "ServiceUnavailable"))
        );
        assert_eq!(unavailable.to_string(), "ServiceUnavailable (503): etcd timeout");
    }

    #[test]
    fn test_status_codes_classify_generic_errors() {
        assert!(StoreError::status_error(404, "NotFound", "gone").is_not_found());
        assert!(StoreError::status_error(409, "Conflict", "rv mismatch").is_conflict());
    }

    #[test]
    fn test_transport_has_no_status() {
        let err = StoreError::from(anyhow::anyhow!("connection reset by peer"));
        assert!(err.status().is_none());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "connection reset by peer");
    }
}
