//! CLI command implementations

pub mod backup;
pub mod categorize;
pub mod import;
pub mod logs;
pub mod register;
pub mod rules;
pub mod status;
pub mod transactions;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use oyster_core::ports::subject_fingerprint;
use oyster_core::services::LogEvent;
use oyster_core::{OysterContext, User};

/// Data directory override
pub const DIR_ENV: &str = "OYSTER_DIR";

/// Non-interactive password
pub const PASSWORD_ENV: &str = "OYSTER_PASSWORD";

/// Who to log in as
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// User name
    #[arg(short, long)]
    pub user: String,
    /// Password (falls back to OYSTER_PASSWORD, then a prompt)
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Get the oyster directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".oyster"))
}

/// Open the oyster directory, creating it on first use
pub fn get_context() -> Result<OysterContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create oyster directory: {:?}", data_dir))?;
    OysterContext::new(&data_dir).context("Failed to open oyster directory")
}

/// Get password from --password flag, OYSTER_PASSWORD env var, or prompt
pub fn resolve_password(flag: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = flag {
        return Ok(p);
    }
    if let Ok(p) = env::var(PASSWORD_ENV) {
        return Ok(p);
    }
    if atty::isnt(atty::Stream::Stdin) {
        bail!("No password given: use --password or set {}", PASSWORD_ENV);
    }

    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(ctx: &OysterContext, event: LogEvent) {
    if let Some(logging) = &ctx.logging {
        let _ = logging.log(event);
    }
}

pub fn log_command(ctx: &OysterContext, command: &str, user: &str) {
    log_event(
        ctx,
        LogEvent::new("command")
            .with_command(command)
            .with_subject(subject_fingerprint(user)),
    );
}

fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Log in, run `op` against the user's data, and log out again
///
/// Logout always runs, so whatever `op` changed is sealed back to disk even
/// when it fails part way.
pub fn with_session<T>(
    creds: Credentials,
    command: &str,
    quiet: bool,
    op: impl FnOnce(&OysterContext, &User) -> Result<T>,
) -> Result<T> {
    let password = resolve_password(creds.password, false)?;
    let ctx = get_context()?;
    log_command(&ctx, command, &creds.user);

    let progress = spinner("Unlocking...", quiet);
    let session = ctx.sessions.login(&creds.user, &password);
    progress.finish_and_clear();
    let session = session?;

    let result = op(&ctx, &session.user);
    if let Err(e) = &result {
        log_event(
            &ctx,
            LogEvent::new("command_failed")
                .with_command(command)
                .with_subject(subject_fingerprint(&creds.user))
                .with_error(e.to_string()),
        );
    }

    let progress = spinner("Saving...", quiet);
    let closed = ctx.sessions.logout(&session.token);
    progress.finish_and_clear();

    let value = result?;
    closed.context("Failed to save user data")?;
    Ok(value)
}
