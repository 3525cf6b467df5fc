//! Session registry - the in-memory table of live sessions
//!
//! One mutex guards the token table, the set of checked-out names and the
//! closed flag. It is only ever held for table updates; no key derivation,
//! crypto or file I/O happens under it.
//!
//! A name is reserved from the moment a Register or Login starts until the
//! session's final flush completes, so a user can be checked out at most once.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::result::{Error, Result};
use crate::domain::User;

const TOKEN_BYTES: usize = 32;

/// Generate an unguessable session token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// A live binding between a token and a checked-out user
pub struct Session {
    token: String,
    user: Arc<User>,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &Arc<User> {
        &self.user
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.name())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<String, Arc<Session>>,
    checked_out: HashSet<String>,
    closed: bool,
}

/// Table of active sessions, owned by the session manager
#[derive(Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a name for an upcoming session
    ///
    /// Fails with [`Error::Duplicate`] if the name is already checked out or
    /// mid-flight in another Register, Login or Logout.
    pub fn reserve(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::Closed);
        }
        if !state.checked_out.insert(name.to_string()) {
            return Err(Error::duplicate(format!("user '{name}' is checked out")));
        }
        Ok(())
    }

    /// Give up a reservation
    pub fn release(&self, name: &str) {
        self.state().checked_out.remove(name);
    }

    /// Open a session for a user whose name is already reserved
    pub fn activate(&self, user: Arc<User>) -> Result<Arc<Session>> {
        let mut state = self.state();
        if state.closed {
            state.checked_out.remove(user.name());
            return Err(Error::Closed);
        }

        let mut token = generate_token();
        while state.sessions.contains_key(&token) {
            token = generate_token();
        }

        let session = Arc::new(Session {
            token: token.clone(),
            user,
            started_at: Utc::now(),
        });
        state.sessions.insert(token, Arc::clone(&session));
        Ok(session)
    }

    /// Pure lookup
    pub fn lookup(&self, token: &str) -> Option<Arc<Session>> {
        self.state().sessions.get(token).cloned()
    }

    /// The checked-out user with this name, if it has a live session
    pub fn find_user(&self, name: &str) -> Option<Arc<User>> {
        self.state()
            .sessions
            .values()
            .find(|s| s.user.name() == name)
            .map(|s| Arc::clone(&s.user))
    }

    /// Remove a session's token for flushing; the name stays reserved
    pub fn check_in(&self, token: &str) -> Result<Arc<Session>> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::Closed);
        }
        state
            .sessions
            .remove(token)
            .ok_or_else(|| Error::not_found("no such session"))
    }

    /// Put back a session whose flush failed
    ///
    /// Returns false if the registry has closed in the meantime.
    pub fn restore(&self, session: Arc<Session>) -> bool {
        let mut state = self.state();
        if state.closed {
            state.checked_out.remove(session.user.name());
            return false;
        }
        state.sessions.insert(session.token.clone(), session);
        true
    }

    /// Close the registry and take every remaining session
    pub fn drain(&self) -> Result<Vec<Arc<Session>>> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::Closed);
        }
        state.closed = true;

        let sessions: Vec<Arc<Session>> = state.sessions.drain().map(|(_, s)| s).collect();
        for session in &sessions {
            state.checked_out.remove(session.user.name());
        }
        Ok(sessions)
    }

    pub fn active_count(&self) -> usize {
        self.state().sessions.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}
