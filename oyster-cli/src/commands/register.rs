//! Register command - create a new user

use anyhow::{Context, Result};
use serde::Serialize;

use super::{get_context, log_command, resolve_password, Credentials};

#[derive(Serialize)]
struct Registered {
    user: String,
    kdf: &'static str,
}

pub fn run(creds: Credentials, json: bool) -> Result<()> {
    let password = resolve_password(creds.password, !json)?;
    let ctx = get_context()?;
    log_command(&ctx, "register", &creds.user);

    let session = ctx.sessions.register(&creds.user, &password)?;
    let kdf = session.user.kdf().algorithm.as_str();

    // Nothing is on disk until the first logout
    ctx.sessions
        .logout(&session.token)
        .context("Failed to save new user")?;

    if json {
        return crate::output::json(Registered { user: creds.user, kdf });
    }

    crate::output::success("User created");
    println!("  Name: {}", creds.user);
    println!("  Key derivation: {}", kdf);
    Ok(())
}
