//! Error types for the hierarchy core
//!
//! # Error Categories
//!
//! - **HierarchyError**: traversal and service failures (missing nodes, cycles, validation)
//! - **StoreError**: record store failures (unavailable store, unknown tables, bad records)
//!
//! Store errors propagate into hierarchy errors unchanged through `?`:
//!
//! ```rust
//! use secureops::errors::{HierarchyResult, StoreError, StoreResult};
//!
//! fn fetch() -> StoreResult<()> {
//!     Err(StoreError::Unavailable("connection refused".to_string()))
//! }
//!
//! fn load() -> HierarchyResult<()> {
//!     fetch()?;
//!     Ok(())
//! }
//!
//! assert!(load().unwrap_err().is_retryable());
//! ```

pub mod hierarchy;
pub mod store;

pub use hierarchy::HierarchyError;
pub use store::StoreError;

/// Result type alias for hierarchy operations
pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Result type alias for record store operations
pub type StoreResult<T> = Result<T, StoreError>;
