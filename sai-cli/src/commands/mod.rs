//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod login;
mod operator;
mod watch;

use anyhow::Result;
use clap::Subcommand;
use sai_dashboard::Command;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Live overview of recent events and the builder fleet
    Watch,
    /// Follow one task and stream its log
    Task {
        /// Task UUID
        id: String,
    },
    /// Follow one event
    Event {
        /// Event UUID
        id: String,
    },
    /// Rebuild a task
    ResetTask {
        /// Task UUID
        task: String,

        /// Only rerun the last build step
        #[arg(long)]
        last_step: bool,
    },
    /// Rebuild every task of an event
    ResetEvent {
        /// Event UUID
        event: String,
    },
    /// Rebuild every task of one platform within an event
    ResetPlatform {
        /// Event UUID
        event: String,
        /// Platform name, as shown on its tasks
        platform: String,
    },
    /// Stop a running task
    Cancel {
        /// Task UUID
        task: String,
    },
    /// Delete an event and its tasks
    DeleteEvent {
        /// Event UUID
        event: String,
    },
    /// Rebuild the Sai software on a builder
    RebuildBuilder {
        /// Builder name
        builder: String,
    },
    /// Keep a power-managed builder powered on
    Stay {
        /// Builder name
        builder: String,

        /// Release the builder instead
        #[arg(long)]
        off: bool,
    },
    /// Log in and print the session cookie
    Login {
        /// User name
        user: String,

        /// Password
        #[arg(long, env = "SAI_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

impl Commands {
    /// The operator command this CLI command issues, if it is one
    fn operator(&self) -> Option<Command> {
        let command = match self {
            Commands::ResetTask { task, last_step } if *last_step => Command::RebuildLastStep {
                task_uuid: task.clone(),
            },
            Commands::ResetTask { task, .. } => Command::ResetTask {
                task_uuid: task.clone(),
            },
            Commands::ResetEvent { event } => Command::ResetEvent {
                event_uuid: event.clone(),
            },
            Commands::ResetPlatform { event, platform } => Command::ResetPlatform {
                event_uuid: event.clone(),
                platform: platform.clone(),
            },
            Commands::Cancel { task } => Command::CancelTask {
                task_uuid: task.clone(),
            },
            Commands::DeleteEvent { event } => Command::DeleteEvent {
                event_uuid: event.clone(),
            },
            Commands::RebuildBuilder { builder } => Command::RebuildBuilder {
                builder_name: builder.clone(),
            },
            Commands::Stay { builder, off } => Command::StayOn {
                builder_name: builder.clone(),
                on: !off,
            },
            Commands::Watch | Commands::Task { .. } | Commands::Event { .. } | Commands::Login { .. } => {
                return None;
            }
        };
        Some(command)
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    if let Some(operator) = command.operator() {
        return operator::run(config, operator).await;
    }
    match command {
        Commands::Watch => watch::run(config, &config.page_url).await,
        Commands::Task { id } => watch::run(config, &config.page_with("task", &id)?).await,
        Commands::Event { id } => watch::run(config, &config.page_with("event", &id)?).await,
        Commands::Login { user, password } => login::run(config, &user, &password).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> Commands {
        TestCli::try_parse_from(std::iter::once("sai").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_reset_task_variants() {
        assert_eq!(
            parse(&["reset-task", "t1"]).operator(),
            Some(Command::ResetTask {
                task_uuid: "t1".into()
            })
        );
        assert_eq!(
            parse(&["reset-task", "t1", "--last-step"]).operator(),
            Some(Command::RebuildLastStep {
                task_uuid: "t1".into()
            })
        );
    }

    #[test]
    fn test_stay_off() {
        assert_eq!(
            parse(&["stay", "b1", "--off"]).operator(),
            Some(Command::StayOn {
                builder_name: "b1".into(),
                on: false
            })
        );
    }

    #[test]
    fn test_views_are_not_operator_commands() {
        assert!(parse(&["watch"]).operator().is_none());
        assert!(parse(&["task", "t1"]).operator().is_none());
        assert_eq!(
            parse(&["reset-platform", "e1", "linux-ubuntu"]).operator(),
            Some(Command::ResetPlatform {
                event_uuid: "e1".into(),
                platform: "linux-ubuntu".into()
            })
        );
    }
}
