//! Record store error types
//!
//! Errors raised by [`RecordStore`](crate::store::RecordStore) implementations.
//! Database failures are classified through
//! [`DbErrorKind`](crate::common::db_errors::DbErrorKind) so callers see the
//! same taxonomy whether the store is backed by SQLite or held in memory.
//!
//! # Examples
//!
//! ```rust
//! use secureops::errors::StoreError;
//!
//! let err = StoreError::UnknownTable("incidents".to_string());
//! assert_eq!(err.error_code(), "UNKNOWN_TABLE");
//! assert!(err.is_client_error());
//! ```

use sea_orm::DbErr;
use thiserror::Error;
use tracing::debug;

use crate::common::db_errors::{format_db_error, DbErrorKind};
use crate::hierarchy::NodeId;

/// Record store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached (connection refused, timeout, deadlock)
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// Table name is not served by this store
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    /// Filter or write referenced a column the table does not have
    #[error("Unknown field '{field}' on table '{table}'")]
    UnknownField {
        /// Table the field was looked up on
        table: String,
        /// Offending field name
        field: String,
    },

    /// Update or delete targeted a missing row
    #[error("Record {id} not found in '{table}'")]
    RecordNotFound {
        /// Table that was searched
        table: String,
        /// Requested row id
        id: NodeId,
    },

    /// Record failed boundary validation or has the wrong shape
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Unique or foreign key constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Unclassified database failure
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Record could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify a sea-orm error raised while performing `operation`
    pub fn from_db_err(operation: &str, err: DbErr) -> Self {
        let (kind, message) = format_db_error(operation, &err);
        debug!("Classified database error as {:?}: {}", kind, err);
        match kind {
            DbErrorKind::UniqueViolation | DbErrorKind::ForeignKeyViolation => {
                StoreError::ConstraintViolation(message)
            }
            DbErrorKind::ConnectionError | DbErrorKind::Timeout | DbErrorKind::Deadlock => {
                StoreError::Unavailable(message)
            }
            DbErrorKind::NotFound | DbErrorKind::Unknown => StoreError::Database(err),
        }
    }

    /// Check if this is a client error (bad table, field or record)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::UnknownTable(_)
                | StoreError::UnknownField { .. }
                | StoreError::InvalidRecord(_)
                | StoreError::ConstraintViolation(_)
        )
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::RecordNotFound { .. })
    }

    /// Transient failures that a caller may choose to retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Get error code for API/CLI responses
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
            StoreError::UnknownTable(_) => "UNKNOWN_TABLE",
            StoreError::UnknownField { .. } => "UNKNOWN_FIELD",
            StoreError::RecordNotFound { .. } => "NOT_FOUND",
            StoreError::InvalidRecord(_) => "VALIDATION_FAILED",
            StoreError::ConstraintViolation(_) => "CONFLICT",
            StoreError::Database(_) => "DATABASE_ERROR",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_record_not_found() {
        let err = StoreError::RecordNotFound {
            table: "sites".to_string(),
            id: 7,
        };
        assert_eq!(err.to_string(), "Record 7 not found in 'sites'");
        assert!(err.is_not_found());
        assert!(!err.is_client_error());
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_connection_failure_is_unavailable() {
        let err = StoreError::from_db_err(
            "fetch sites",
            DbErr::Conn(RuntimeErr::Internal("Connection refused".to_string())),
        );
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
    }

    #[test]
    fn test_foreign_key_failure_is_constraint_violation() {
        let err = StoreError::from_db_err(
            "insert staff",
            DbErr::Exec(RuntimeErr::Internal(
                "FOREIGN KEY constraint failed".to_string(),
            )),
        );
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unknown_field_message() {
        let err = StoreError::UnknownField {
            table: "staff".to_string(),
            field: "salary".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown field 'salary' on table 'staff'");
        assert_eq!(err.error_code(), "UNKNOWN_FIELD");
    }
}
