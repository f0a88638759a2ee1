//! Site and staff hierarchies for a security-operations back office.
//!
//! Nodes are loaded from a [`store::RecordStore`] into an immutable
//! [`hierarchy::HierarchyGraph`], which answers children, ancestor-chain and
//! subtree queries with cycle detection. [`services::HierarchyService`] wraps
//! the store for guarded writes, and [`export`] renders org charts.

pub mod common;
pub mod config;
pub mod database;
pub mod errors;
pub mod export;
pub mod hierarchy;
pub mod services;
pub mod store;
