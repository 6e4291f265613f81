//! Login command

use anyhow::{Context, Result};
use colored::*;

use crate::config::Config;

/// Logs in and prints the cookie for later commands
pub async fn run(config: &Config, user: &str, password: &str) -> Result<()> {
    let mut client = config.client(&config.page_url)?;
    client
        .login(user, password)
        .await
        .with_context(|| format!("Login as {user} failed"))?;

    eprintln!("{} Logged in as {}", "✓".green(), user.bold());
    if let Some(cookie) = client.cookie() {
        println!("export SAI_COOKIE='{cookie}'");
    }
    Ok(())
}
