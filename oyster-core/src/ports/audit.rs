//! Audit log port - privacy-safe session events

use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

/// Short, stable identifier for a user name
///
/// Events carry this instead of the name itself.
pub fn subject_fingerprint(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(&digest[..6])
}

/// A session lifecycle event
///
/// Never carries passwords, keys, tokens or financial data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub event: String,
    pub subject: Option<String>,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            subject: None,
            error: None,
        }
    }

    /// Attach the fingerprint of the user this event concerns
    pub fn for_user(mut self, name: &str) -> Self {
        self.subject = Some(subject_fingerprint(name));
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Sink for session events
///
/// Recording must not fail the operation being recorded, so errors are
/// swallowed by implementations.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditLog;

impl AuditLog for NoopAuditLog {
    fn record(&self, _event: AuditEvent) {}
}

/// Keeps events in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Names of recorded events, oldest first
    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_hides_name() {
        let fp = subject_fingerprint("bob");
        assert_eq!(fp.len(), 12);
        assert!(!fp.contains("bob"));
        assert_eq!(fp, subject_fingerprint("bob"));
        assert_ne!(fp, subject_fingerprint("alice"));
    }

    #[test]
    fn test_memory_log_records_in_order() {
        let log = MemoryAuditLog::new();
        log.record(AuditEvent::new("register").for_user("bob"));
        log.record(AuditEvent::new("login_failed").with_error("unauthorized"));
        assert_eq!(log.event_names(), vec!["register", "login_failed"]);
        assert_eq!(log.events()[0].subject, Some(subject_fingerprint("bob")));
    }
}
