//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The session
//! manager depends only on these traits, not on concrete implementations.

mod audit;
mod store;

pub use audit::{subject_fingerprint, AuditEvent, AuditLog, MemoryAuditLog, NoopAuditLog};
pub use store::UserStore;
