//! Hierarchy error types
//!
//! Errors raised by [`HierarchyGraph`](crate::hierarchy::HierarchyGraph)
//! traversal and by [`HierarchyService`](crate::services::HierarchyService).
//! Store failures are wrapped unchanged.
//!
//! # Examples
//!
//! ```rust
//! use secureops::errors::HierarchyError;
//!
//! let err = HierarchyError::CycleDetected("1 -> 2 -> 3 -> 1".to_string());
//! assert_eq!(err.error_code(), "CYCLE_DETECTED");
//! assert!(!err.is_retryable());
//! ```

use thiserror::Error;

use super::StoreError;
use crate::hierarchy::NodeId;

/// Hierarchy errors
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// Failure surfaced from the record store
    #[error("Record store error: {0}")]
    RecordStoreUnavailable(#[from] StoreError),

    /// Requested node is not part of the loaded snapshot
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    /// Parent links loop back on themselves; carries the offending path
    #[error("Cycle detected in hierarchy: {0}")]
    CycleDetected(String),

    /// A walk went deeper than the configured limit
    #[error("Hierarchy below node {id} exceeds the depth limit of {limit}")]
    DepthLimitExceeded {
        /// Node the walk started from
        id: NodeId,
        /// Configured limit
        limit: usize,
    },

    /// Service-level rejection of a write
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl HierarchyError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        match self {
            HierarchyError::NodeNotFound(_) => true,
            HierarchyError::RecordStoreUnavailable(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        match self {
            HierarchyError::CycleDetected(_)
            | HierarchyError::DepthLimitExceeded { .. }
            | HierarchyError::Validation(_) => true,
            HierarchyError::RecordStoreUnavailable(err) => err.is_client_error(),
            HierarchyError::NodeNotFound(_) => false,
        }
    }

    /// Only transient store failures are worth retrying; corrupted parent
    /// data never heals on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            HierarchyError::RecordStoreUnavailable(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Get error code for API/CLI responses
    pub fn error_code(&self) -> &'static str {
        match self {
            HierarchyError::RecordStoreUnavailable(err) => err.error_code(),
            HierarchyError::NodeNotFound(_) => "NOT_FOUND",
            HierarchyError::CycleDetected(_) => "CYCLE_DETECTED",
            HierarchyError::DepthLimitExceeded { .. } => "DEPTH_LIMIT_EXCEEDED",
            HierarchyError::Validation(_) => "VALIDATION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_not_found() {
        let err = HierarchyError::NodeNotFound(42);
        assert_eq!(err.to_string(), "Node 42 not found");
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_cycle_detected() {
        let err = HierarchyError::CycleDetected("3 -> 3".to_string());
        assert_eq!(err.to_string(), "Cycle detected in hierarchy: 3 -> 3");
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_errors_pass_through() {
        let err: HierarchyError = StoreError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(err, HierarchyError::RecordStoreUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
    }

    #[test]
    fn test_depth_limit_message() {
        let err = HierarchyError::DepthLimitExceeded { id: 1, limit: 4 };
        assert_eq!(
            err.to_string(),
            "Hierarchy below node 1 exceeds the depth limit of 4"
        );
        assert_eq!(err.error_code(), "DEPTH_LIMIT_EXCEEDED");
    }
}
