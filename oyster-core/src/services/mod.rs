//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod backup;
pub mod encryption;
pub mod import;
pub mod logging;
pub mod record;
pub mod registry;
pub mod session;
mod status;

pub use backup::{BackupService, ClearResult};
pub use import::{import_csv, read_transactions, ImportResult};
pub use logging::{LogEntry, LogEvent, LogStats, LoggingService};
pub use registry::{Session, SessionRegistry};
pub use session::{ActiveSession, SessionManager, SessionSettings};
pub use status::{DateRange, StatusService, StatusSummary};
