//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Local filesystem for the UserStore port
//! - The DuckDB event log (see `services::logging`) for the AuditLog port

pub mod file_store;

pub use file_store::FileUserStore;
