//! Output formatting utilities

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use oyster_core::{Error, OperationResult};
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a successful result envelope
pub fn json<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

/// Print a failed result envelope, keeping the core error's kind when there is one
pub fn json_error(err: &anyhow::Error) {
    let result: OperationResult<()> = match err.downcast_ref::<Error>() {
        Some(core) => OperationResult::from_error(core),
        None => OperationResult::fail(format!("{:#}", err)),
    };
    match serde_json::to_string_pretty(&result) {
        Ok(text) => println!("{}", text),
        Err(_) => error(&format!("{:#}", err)),
    }
}
