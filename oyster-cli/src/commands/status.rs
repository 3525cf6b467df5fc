//! Status command - show a summary of a user's data

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{with_session, Credentials};

pub fn run(creds: Credentials, json: bool) -> Result<()> {
    let status = with_session(creds, "status", json, |ctx, user| {
        Ok(ctx.status_service.get_status(user)?)
    })?;

    if json {
        return crate::output::json(status);
    }

    println!("{}", format!("Status for {}", status.user).bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);
    table.add_row(vec!["Categorized", &status.categorized.to_string()]);
    table.add_row(vec!["Uncategorized", &status.uncategorized.to_string()]);
    table.add_row(vec!["Rules", &status.total_rules.to_string()]);
    table.add_row(vec!["Key derivation", status.kdf.as_str()]);
    table.add_row(vec!["Users in store", &status.stored_users.to_string()]);
    println!("{}", table);

    if let (Some(earliest), Some(latest)) = (&status.date_range.earliest, &status.date_range.latest) {
        println!();
        println!("Date range: {} to {}", earliest, latest);
    }

    Ok(())
}
