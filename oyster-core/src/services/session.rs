//! Session manager - Register / Login / Logout / Shutdown over a user store
//!
//! Lifecycle of a user:
//!
//! ```text
//! Anonymous --register--> Active --logout--> Persisted --login--> Active
//! ```
//!
//! Registered users live only in memory until their first logout (or
//! shutdown) writes the sealed record.

use std::sync::Arc;

use crate::domain::result::{Error, FlushFailure, Result};
use crate::domain::{Argon2Params, KdfAlgorithm, User};
use crate::ports::{AuditEvent, AuditLog, UserStore};
use crate::services::encryption::{derive_with, new_kdf_metadata};
use crate::services::registry::{Session, SessionRegistry};

/// Default minimum password length in bytes
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 4;

/// Tunables for the session manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub min_password_len: usize,
    /// Scheme used for newly registered users
    pub kdf: KdfAlgorithm,
    pub argon2: Argon2Params,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
            kdf: KdfAlgorithm::default(),
            argon2: Argon2Params::default(),
        }
    }
}

/// A freshly opened session
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub token: String,
    pub user: Arc<User>,
}

impl From<&Session> for ActiveSession {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token().to_string(),
            user: Arc::clone(session.user()),
        }
    }
}

/// Public facade over the registry and the durable store
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    audit: Arc<dyn AuditLog>,
    registry: SessionRegistry,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(store: Arc<dyn UserStore>, audit: Arc<dyn AuditLog>, settings: SessionSettings) -> Self {
        Self {
            store,
            audit,
            registry: SessionRegistry::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn record(&self, event: &str, name: &str) {
        self.audit.record(AuditEvent::new(event).for_user(name));
    }

    fn record_error(&self, event: &str, name: &str, error: &Error) {
        self.audit
            .record(AuditEvent::new(event).for_user(name).with_error(error.kind()));
    }

    fn validate_credentials(&self, name: &str, password: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::validation("username must not be empty"));
        }
        if password.len() < self.settings.min_password_len {
            return Err(Error::validation(format!(
                "password must be at least {} bytes",
                self.settings.min_password_len
            )));
        }
        Ok(())
    }

    /// Run `f` while holding a reservation on `name`, releasing it on error
    fn reserved<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let result = f();
        if result.is_err() {
            self.registry.release(name);
        }
        result
    }

    /// Create a new user and open a session for it
    ///
    /// The user is not persisted until logout or shutdown.
    pub fn register(&self, name: &str, password: &str) -> Result<ActiveSession> {
        if self.registry.is_closed() {
            return Err(Error::Closed);
        }
        self.validate_credentials(name, password)?;

        if let Err(e) = self.registry.reserve(name) {
            self.record_error("register_rejected", name, &e);
            return Err(e);
        }

        let user = self.reserved(name, || {
            if self.store.exists(name)? {
                return Err(Error::duplicate(format!("user '{name}' already exists")));
            }
            let kdf = new_kdf_metadata(self.settings.kdf, &self.settings.argon2);
            let passkey = derive_with(password, &kdf)?;
            Ok(Arc::new(User::new(name, passkey, kdf)))
        });
        let user = match user {
            Ok(user) => user,
            Err(e) => {
                self.record_error("register_rejected", name, &e);
                return Err(e);
            }
        };

        let session = self.registry.activate(user)?;
        self.record("register", name);
        Ok(ActiveSession::from(session.as_ref()))
    }

    /// Authenticate and check a user out of the store
    ///
    /// Unknown user and wrong password are both [`Error::Unauthorized`].
    pub fn login(&self, name: &str, password: &str) -> Result<ActiveSession> {
        match self.registry.reserve(name) {
            Ok(()) => {}
            Err(Error::Duplicate(_)) => return Err(self.reject_checked_out(name, password)),
            Err(e) => return Err(e),
        }

        let loaded = self.reserved(name, || {
            let kdf = self.store.kdf_for(name)?;
            let passkey = derive_with(password, &kdf)?;
            self.store.load(name, passkey, kdf)
        });
        let user = match loaded {
            Ok(user) => Arc::new(user),
            Err(e) => return Err(self.login_failure(name, e)),
        };

        let session = self.registry.activate(user)?;
        self.record("login", name);
        Ok(ActiveSession::from(session.as_ref()))
    }

    fn login_failure(&self, name: &str, error: Error) -> Error {
        match error {
            Error::NotFound(_) => {
                self.record("login_failed", name);
                Error::Unauthorized
            }
            Error::Integrity(_) => {
                self.record("login_integrity_failure", name);
                Error::Unauthorized
            }
            other => {
                self.record_error("login_error", name, &other);
                other
            }
        }
    }

    /// A login for a name that is already checked out
    ///
    /// The password is still verified so that an active session does not
    /// reveal whether the caller knows it.
    fn reject_checked_out(&self, name: &str, password: &str) -> Error {
        let verified = match self.registry.find_user(name) {
            Some(user) => {
                derive_with(password, user.kdf()).is_ok_and(|key| &key == user.passkey())
            }
            None => self
                .store
                .kdf_for(name)
                .and_then(|kdf| {
                    let key = derive_with(password, &kdf)?;
                    self.store.load(name, key, kdf)
                })
                .is_ok(),
        };

        if verified {
            self.record("login_rejected_active", name);
            Error::SessionActive
        } else {
            self.record("login_failed", name);
            Error::Unauthorized
        }
    }

    /// The user behind a live token
    pub fn valid_session(&self, token: &str) -> Option<Arc<User>> {
        self.registry.lookup(token).map(|s| Arc::clone(s.user()))
    }

    /// Full session details behind a live token
    pub fn session(&self, token: &str) -> Option<Arc<Session>> {
        self.registry.lookup(token)
    }

    /// End a session, persisting the user before returning
    ///
    /// If the write fails the session stays valid and the error is returned,
    /// unless the manager was shut down during the write.
    pub fn logout(&self, token: &str) -> Result<()> {
        let session = self.registry.check_in(token)?;
        let name = session.user().name().to_string();

        match self.store.save(session.user()) {
            Ok(()) => {
                self.registry.release(&name);
                self.record("logout", &name);
                Ok(())
            }
            Err(e) => {
                self.record_error("logout_flush_failed", &name, &e);
                if !self.registry.restore(session) {
                    // Shut down meanwhile: nothing holds the changes any more
                    self.record_error("logout_flush_lost", &name, &e);
                }
                Err(e)
            }
        }
    }

    /// Persist every active session and close the manager
    ///
    /// Every user is attempted; failures are collected into
    /// [`Error::Flush`]. All later calls fail with [`Error::Closed`].
    pub fn shutdown(&self) -> Result<()> {
        let sessions = self.registry.drain()?;

        let mut failures = Vec::new();
        for session in &sessions {
            let user = session.user();
            if let Err(e) = self.store.save(user) {
                self.record_error("shutdown_flush_failed", user.name(), &e);
                failures.push(FlushFailure {
                    user: user.name().to_string(),
                    reason: e.to_string(),
                });
            }
        }

        self.audit.record(AuditEvent::new("shutdown"));
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Flush(failures))
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.active_count()
    }

    pub fn is_closed(&self) -> bool {
        self.registry.is_closed()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // Failures are already recorded per user
        if !self.registry.is_closed() {
            let _ = self.shutdown();
        }
    }
}
