//! Import command - import transactions from a bank CSV export

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use super::{with_session, Credentials};
use oyster_core::domain::CategorizeResult;
use oyster_core::services::{import_csv, ImportResult};

#[derive(Serialize)]
struct ImportOutput {
    #[serde(flatten)]
    import: ImportResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    categorize: Option<CategorizeResult>,
}

pub fn run(file: &Path, creds: Credentials, categorize: bool, json: bool) -> Result<()> {
    let input = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;

    let output = with_session(creds, "import", json, |_, user| {
        let import = import_csv(user, input)?;
        let categorize = categorize.then(|| user.categorize());
        Ok(ImportOutput { import, categorize })
    })?;

    if json {
        return crate::output::json(output);
    }

    crate::output::success("Import complete");
    println!("  Rows read: {}", output.import.discovered);
    println!("  Imported: {}", output.import.imported);
    if output.import.skipped > 0 {
        println!("  Already present: {}", output.import.skipped.to_string().dimmed());
    }
    if let Some(result) = output.categorize {
        println!("  Categorized: {}", result.categorized);
        for conflict in &result.conflicts {
            crate::output::warning(&format!("  {}", conflict));
        }
    }
    Ok(())
}
