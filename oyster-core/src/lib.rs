//! Oyster Core - encrypted session & credential store for personal finance
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, Transaction, Rule, key material)
//! - **ports**: Trait definitions for external dependencies (UserStore, AuditLog)
//! - **services**: Business logic (crypto, session manager, import, backups)
//! - **adapters**: Concrete implementations (filesystem user store)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::FileUserStore;
use config::Config;
use ports::{AuditLog, NoopAuditLog, UserStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, FlushFailure, OperationResult};
pub use domain::{Passkey, Rule, RuleSet, Transaction, User};
pub use services::{ActiveSession, SessionManager};

/// Main context for Oyster operations
///
/// Owns the user directory (exclusively, for as long as it lives), the
/// session manager, and the services built on top of it.
pub struct OysterContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub sessions: SessionManager,
    pub status_service: StatusService,
    /// `None` when the event log could not be opened
    pub logging: Option<Arc<LoggingService>>,
}

impl OysterContext {
    /// Open the data directory
    ///
    /// Fails if another process already has its user directory open.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let store: Arc<dyn UserStore> = Arc::new(FileUserStore::open(data_dir)?);

        let logging = LoggingService::new(data_dir, env!("CARGO_PKG_VERSION"))
            .ok()
            .map(Arc::new);
        let audit: Arc<dyn AuditLog> = match &logging {
            Some(logging) => Arc::clone(logging) as Arc<dyn AuditLog>,
            None => Arc::new(NoopAuditLog),
        };

        let sessions = SessionManager::new(Arc::clone(&store), audit, config.session_settings());
        let status_service = StatusService::new(store);

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            sessions,
            status_service,
            logging,
        })
    }

    /// Flush every active session and close the manager
    pub fn shutdown(&self) -> Result<()> {
        self.sessions.shutdown()?;
        Ok(())
    }
}
