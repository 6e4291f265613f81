//! Sai CLI
//!
//! Terminal front end for a Sai CI server: a live dashboard of events,
//! tasks and the builder fleet, task log streaming and operator commands.

mod commands;
mod config;
mod view;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sai")]
#[command(about = "Sai CI dashboard client", long_about = None)]
struct Cli {
    /// Dashboard page URL
    #[arg(long, env = "SAI_PAGE_URL", default_value = "http://localhost/sai/")]
    page_url: String,

    /// Session cookie printed by `sai login`
    #[arg(long, env = "SAI_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Seconds to wait before reconnecting
    #[arg(long, env = "SAI_RECONNECT_SECS", default_value_t = 4)]
    reconnect_secs: u64,

    /// Milliseconds to batch log output for
    #[arg(long, env = "SAI_LOG_FLUSH_MS", default_value_t = 500)]
    log_flush_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sai_cli=info,sai_client=info,sai_dashboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::new(cli.page_url);
    config.cookie = cli.cookie;
    config.reconnect = Duration::from_secs(cli.reconnect_secs);
    config.log_flush = Duration::from_millis(cli.log_flush_ms);
    config.validate()?;

    handle_command(cli.command, &config).await
}
