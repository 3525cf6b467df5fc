//! Categorize command - apply rules to uncategorized transactions

use anyhow::Result;
use colored::Colorize;

use super::{with_session, Credentials};

pub fn run(creds: Credentials, json: bool) -> Result<()> {
    let result = with_session(creds, "categorize", json, |_, user| Ok(user.categorize()))?;

    if json {
        return crate::output::json(result);
    }

    crate::output::success("Categorization complete");
    println!("  Evaluated: {}", result.evaluated);
    println!("  Categorized: {}", result.categorized);
    if !result.conflicts.is_empty() {
        println!();
        println!("{}", "Conflicts".yellow().bold());
        for conflict in &result.conflicts {
            println!("  {}", conflict);
        }
    }
    Ok(())
}
