//! Error types for the mutation pipeline

use thiserror::Error;

use crate::mutation::{RootId, Tag};

/// Pipeline error
///
/// Per-record variants are contained to the record that raised them;
/// `BackendMismatch` rejects a whole batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("parent {parent} of node {tag} not found")]
    ParentNotFound { tag: Tag, parent: Tag },

    #[error("unknown tag {0}")]
    UnknownTag(Tag),

    #[error("tag {0} is already registered")]
    DuplicateTag(Tag),

    #[error("no native view for '{view_name}' (tag {tag})")]
    ViewCreationFailed { tag: Tag, view_name: String },

    #[error("style '{prop}' has unusable value '{value}', using default")]
    MeasurementDegraded { prop: String, value: String },

    #[error("backend payload rejected: {0}")]
    BackendMismatch(String),

    #[error("root {0} is detached")]
    RootDetached(RootId),

    #[error("root {0} is already attached")]
    RootAlreadyAttached(RootId),

    #[error("measurement of node {tag} in root {root_id} timed out")]
    MeasureTimeout { root_id: RootId, tag: Tag },

    #[error("measurement of node {tag} in root {root_id} is already in flight")]
    MeasureInFlight { root_id: RootId, tag: Tag },

    #[error("configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Errors that drop a single record without affecting the batch
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            BridgeError::ParentNotFound { .. }
                | BridgeError::UnknownTag(_)
                | BridgeError::DuplicateTag(_)
                | BridgeError::ViewCreationFailed { .. }
        )
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BridgeError::ParentNotFound { tag: 2, parent: 9 };
        assert_eq!(err.to_string(), "parent 9 of node 2 not found");
        assert!(err.is_record_level());
        assert!(!BridgeError::BackendMismatch("bad".into()).is_record_level());
    }
}
