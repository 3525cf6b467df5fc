//! Event log migrations - embedded SQL files
//!
//! Compiled in with include_str! and applied in order by
//! `LoggingService`. Each entry is (filename, sql).

/// New migrations get a NNN_description.sql file and an entry here, in order
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
