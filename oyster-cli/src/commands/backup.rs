//! Backup command - manage archives of the sealed user files

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::{get_context, get_data_dir};
use crate::output::create_table;
use oyster_core::services::BackupService;

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// Maximum number of backups to keep (defaults to settings.json)
        #[arg(long, short = 'm')]
        max_backups: Option<usize>,
    },
    /// List available backups
    List,
    /// Restore from a backup
    Restore {
        /// Backup name to restore
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Clear all backups
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

/// Backup service without opening the user directory
fn get_backup_service() -> Result<BackupService> {
    Ok(BackupService::new(get_data_dir()?))
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

pub fn run(command: BackupCommands, json: bool) -> Result<()> {
    match command {
        BackupCommands::Create { max_backups } => {
            // Holding the context keeps other processes from writing mid-archive
            let ctx = get_context()?;
            let max_backups = max_backups.or(ctx.config.max_backups);
            let result = BackupService::new(ctx.data_dir.clone()).create(max_backups)?;
            if json {
                return crate::output::json(result);
            }
            crate::output::success("Backup created");
            println!("  Name: {}", result.name);
            println!("  Size: {}", result.size_display());
            if let Some(users) = result.users {
                println!("  Users: {}", users);
            }
        }
        BackupCommands::List => {
            let backups = get_backup_service()?.list()?;
            if json {
                return crate::output::json(backups);
            }
            if backups.is_empty() {
                println!("No backups found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Name", "Created", "Size", "Users"]);
            for backup in &backups {
                table.add_row(vec![
                    backup.name.clone(),
                    backup.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    backup.size_display(),
                    backup.users.map(|n| n.to_string()).unwrap_or_default(),
                ]);
            }
            println!("{}", table);
        }
        BackupCommands::Restore { name, force } => {
            // Restore takes the store lock itself, so no context here
            let backup_service = get_backup_service()?;
            if !force && !json && !confirm(&format!("Restore from backup '{}'?", name))? {
                println!("Cancelled.");
                return Ok(());
            }
            let safety = backup_service.restore(&name)?;
            if json {
                return crate::output::json(serde_json::json!({
                    "restored": name,
                    "preRestoreBackup": safety,
                }));
            }
            println!("{}", format!("Restored from backup: {}", name).green());
            if let Some(safety) = safety {
                println!("  Previous data saved as: {}", safety);
            }
        }
        BackupCommands::Clear { force } => {
            let backup_service = get_backup_service()?;
            if !force && !json && !confirm("Delete all backups?")? {
                println!("Cancelled.");
                return Ok(());
            }
            let result = backup_service.clear()?;
            if json {
                return crate::output::json(result);
            }
            println!("Deleted {} backup(s)", result.deleted);
        }
    }

    Ok(())
}
