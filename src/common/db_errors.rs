//! Database error categorization and message formatting
//!
//! Classifies sea-orm errors so the SQLite-backed record store can report
//! them with the same taxonomy as any other store.
//!
//! # Examples
//!
//! ```rust
//! use secureops::common::db_errors::*;
//! use sea_orm::DbErr;
//!
//! let err = DbErr::RecordNotFound("Site not found".to_string());
//! let (kind, message) = format_db_error("find site", &err);
//!
//! assert_eq!(kind, DbErrorKind::NotFound);
//! assert_eq!(message, "find site: record not found");
//! ```

use sea_orm::{DbErr, SqlErr};

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Record not found (query returned no results)
    NotFound,

    /// Unique constraint violation
    UniqueViolation,

    /// Foreign key constraint violation
    ///
    /// For the hierarchy tables this means a parent or supervisor that does
    /// not exist, or a delete that would orphan children.
    ForeignKeyViolation,

    /// Database connection error
    ConnectionError,

    /// Query timeout
    Timeout,

    /// Transaction deadlock
    Deadlock,

    /// Unknown/other database error
    Unknown,
}

impl DbErrorKind {
    /// Categorize a sea_orm database error
    ///
    /// ```
    /// use secureops::common::db_errors::DbErrorKind;
    /// use sea_orm::DbErr;
    ///
    /// let err = DbErr::RecordNotFound("Staff not found".to_string());
    /// assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
    /// ```
    pub fn from_db_err(err: &DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }

        let msg_lower = err.to_string().to_lowercase();
        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) if msg_lower.contains("timeout") => {
                Self::Timeout
            }
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::ConnectionError,
            DbErr::Exec(_) | DbErr::Query(_) => {
                if msg_lower.contains("unique") || msg_lower.contains("duplicate") {
                    Self::UniqueViolation
                } else if msg_lower.contains("foreign key") || msg_lower.contains("fk_") {
                    Self::ForeignKeyViolation
                } else if msg_lower.contains("deadlock") {
                    Self::Deadlock
                } else if msg_lower.contains("timeout") {
                    Self::Timeout
                } else {
                    Self::Unknown
                }
            }
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionError | Self::Timeout | Self::Deadlock)
    }

    /// Check if this is a client error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::UniqueViolation | Self::ForeignKeyViolation
        )
    }
}

/// Format database error with operation context
///
/// Returns the categorized kind together with a short message naming the
/// operation that failed.
pub fn format_db_error(operation: &str, err: &DbErr) -> (DbErrorKind, String) {
    let kind = DbErrorKind::from_db_err(err);

    let message = match kind {
        DbErrorKind::NotFound => format!("{}: record not found", operation),
        DbErrorKind::UniqueViolation => format!("{}: duplicate key violation", operation),
        DbErrorKind::ForeignKeyViolation => {
            format!("{}: foreign key constraint violation", operation)
        }
        DbErrorKind::ConnectionError => format!("{}: database connection failed", operation),
        DbErrorKind::Timeout => format!("{}: query timeout", operation),
        DbErrorKind::Deadlock => format!("{}: transaction deadlock", operation),
        DbErrorKind::Unknown => format!("{}: database error - {}", operation, err),
    };

    (kind, message)
}
