//! Rules command - manage categorization rules

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;

use super::{with_session, Credentials};
use crate::output::create_table;
use oyster_core::Rule;

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules
    List {
        #[command(flatten)]
        creds: Credentials,
    },
    /// Add a rule (fails if the name is taken)
    Add {
        #[command(flatten)]
        creds: Credentials,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Add a rule or replace the one with the same name
    Upsert {
        #[command(flatten)]
        creds: Credentials,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Delete a rule by name
    Delete {
        #[command(flatten)]
        creds: Credentials,
        /// Rule name
        name: String,
    },
}

/// A rule given either as flags or as a JSON file (for nested and/or rules)
#[derive(Args)]
pub struct RuleArgs {
    /// Read the rule from a JSON file
    #[arg(long, conflicts_with_all = ["name", "category"])]
    file: Option<PathBuf>,
    /// Rule name
    #[arg(long, required_unless_present = "file")]
    name: Option<String>,
    /// Category assigned to matching transactions
    #[arg(long, required_unless_present = "file")]
    category: Option<String>,
    /// Regex the description must match
    #[arg(long)]
    description: Option<String>,
    /// Only transactions after this date (YYYY-MM-DD, exclusive)
    #[arg(long)]
    after: Option<NaiveDate>,
    /// Only transactions before this date (YYYY-MM-DD, exclusive)
    #[arg(long)]
    before: Option<NaiveDate>,
    /// Minimum amount (inclusive)
    #[arg(long, allow_negative_numbers = true)]
    min: Option<Decimal>,
    /// Maximum amount (inclusive)
    #[arg(long, allow_negative_numbers = true)]
    max: Option<Decimal>,
}

impl RuleArgs {
    fn build(self) -> Result<Rule> {
        if let Some(path) = self.file {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return serde_json::from_str(&text)
                .with_context(|| format!("Invalid rule in {}", path.display()));
        }

        let name = self.name.context("--name is required")?;
        let category = self.category.context("--category is required")?;
        let mut rule = Rule::new(name, category);
        if let Some(pattern) = &self.description {
            rule = rule.with_description(pattern)?;
        }
        if self.after.is_some() || self.before.is_some() {
            rule = rule.with_dates(self.after, self.before);
        }
        if self.min.is_some() || self.max.is_some() {
            rule = rule.with_amounts(self.min, self.max);
        }
        Ok(rule)
    }
}

fn describe(rule: &Rule) -> String {
    let mut parts = Vec::new();
    if let Some(pattern) = &rule.description {
        parts.push(format!("description ~ /{}/", pattern.as_str()));
    }
    if let Some(range) = &rule.date_between {
        if let Some(after) = range.after {
            parts.push(format!("after {}", after));
        }
        if let Some(before) = range.before {
            parts.push(format!("before {}", before));
        }
    }
    if let Some(range) = &rule.amount_between {
        match (range.min, range.max) {
            (Some(min), Some(max)) => parts.push(format!("{} to {}", min, max)),
            (Some(min), None) => parts.push(format!(">= {}", min)),
            (None, Some(max)) => parts.push(format!("<= {}", max)),
            (None, None) => {}
        }
    }
    if !rule.and.is_empty() {
        parts.push(format!("and {} rule(s)", rule.and.len()));
    }
    if !rule.or.is_empty() {
        parts.push(format!("or {} rule(s)", rule.or.len()));
    }
    if parts.is_empty() {
        "matches everything".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn run(command: RulesCommands, json: bool) -> Result<()> {
    match command {
        RulesCommands::List { creds } => {
            let rules = with_session(creds, "rules list", json, |_, user| Ok(user.rules()))?;
            if json {
                return crate::output::json(rules);
            }
            if rules.is_empty() {
                println!("No rules defined.");
                return Ok(());
            }
            let mut table = create_table();
            table.set_header(vec!["Name", "Category", "Criteria"]);
            for rule in &rules {
                table.add_row(vec![rule.name.clone(), rule.category.clone(), describe(rule)]);
            }
            println!("{}", table);
        }
        RulesCommands::Add { creds, rule } => {
            let rule = rule.build()?;
            let name = rule.name.clone();
            let added = with_session(creds, "rules add", json, |_, user| Ok(user.add_rule(rule)))?;
            if !added {
                bail!("A rule named '{}' already exists (use upsert to replace it)", name);
            }
            if json {
                return crate::output::json(serde_json::json!({ "added": name }));
            }
            println!("{}", format!("Rule '{}' added", name).green());
        }
        RulesCommands::Upsert { creds, rule } => {
            let rule = rule.build()?;
            let name = rule.name.clone();
            with_session(creds, "rules upsert", json, |_, user| {
                user.upsert_rule(rule);
                Ok(())
            })?;
            if json {
                return crate::output::json(serde_json::json!({ "saved": name }));
            }
            println!("{}", format!("Rule '{}' saved", name).green());
        }
        RulesCommands::Delete { creds, name } => {
            let deleted = with_session(creds, "rules delete", json, |_, user| Ok(user.delete_rule(&name)))?;
            if !deleted {
                bail!("No rule named '{}'", name);
            }
            if json {
                return crate::output::json(serde_json::json!({ "deleted": name }));
            }
            println!("Rule '{}' deleted", name);
        }
    }

    Ok(())
}
