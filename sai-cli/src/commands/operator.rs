//! One-shot operator commands
//!
//! Connects like the dashboard does, waits for the server to say whether
//! this client is authorized, then issues the command and disconnects.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::*;
use sai_client::Transport;
use sai_dashboard::session::AuthState;
use sai_dashboard::{Command, Dashboard, Effect, PageContext};
use tracing::debug;

use super::watch::now_ms;
use crate::config::Config;

/// How long to wait for the first frame that carries the auth state
const AUTH_WAIT: Duration = Duration::from_secs(10);

/// Reads frames until the auth state is known
async fn await_auth<T: Transport>(dash: &mut Dashboard, link: &mut T) -> Result<()> {
    while matches!(dash.session().auth(), AuthState::Unknown) {
        let Some(frame) = link.next_text().await? else {
            bail!("Server closed the connection");
        };
        for effect in dash.on_frame(&frame, now_ms()) {
            if let Effect::Reload(reason) = effect {
                bail!("Server refused the session ({:?})", reason);
            }
        }
    }
    Ok(())
}

/// Sends `command` on an open link once the session is authorized
pub(crate) async fn issue<T: Transport>(
    dash: &mut Dashboard,
    link: &mut T,
    command: &Command,
) -> Result<()> {
    for effect in dash.on_open(now_ms()) {
        if let Effect::Send(message) = effect {
            link.send_message(&message).await?;
        }
    }
    tokio::time::timeout(AUTH_WAIT, await_auth(dash, link))
        .await
        .context("Timed out waiting for the server")??;

    if !dash.session().is_authorized() {
        bail!("Not authorized; run `sai login` and export SAI_COOKIE");
    }

    for effect in dash.command(command, now_ms()) {
        if let Effect::Send(message) = effect {
            link.send_message(&message).await?;
        }
    }
    Ok(())
}

pub async fn run(config: &Config, command: Command) -> Result<()> {
    let client = config.client(&config.page_url)?;
    let page = PageContext::from_url(client.page_url());
    let mut dash = Dashboard::new(config.dashboard(), page);

    dash.on_connecting();
    let mut link = client.connect().await.context("Failed to connect to Sai")?;
    issue(&mut dash, &mut link, &command).await?;
    if let Err(e) = link.close().await {
        debug!("Close failed: {}", e);
    }

    println!("{} {}", "✓".green(), command.to_message().schema().dimmed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sai_client::Result as ClientResult;
    use sai_core::dto::outbound::ClientMessage;
    use sai_dashboard::DashboardConfig;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Scripted {
        inbound: VecDeque<String>,
        sent: Vec<String>,
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send_text(&mut self, text: String) -> ClientResult<()> {
            self.sent.push(text);
            Ok(())
        }

        async fn next_text(&mut self) -> ClientResult<Option<String>> {
            Ok(self.inbound.pop_front())
        }
    }

    fn overview(authorized: u8) -> String {
        format!(r#"{{"schema":"sai.warmcat.com.overview","authorized":{authorized},"overview":[]}}"#)
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(
            DashboardConfig::default(),
            PageContext::parse("https://ci.example.com/sai/").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_command_sent_when_authorized() {
        let mut dash = dashboard();
        let mut link = Scripted {
            inbound: VecDeque::from(vec![overview(1)]),
            ..Default::default()
        };
        let command = Command::CancelTask {
            task_uuid: "t1".into(),
        };

        issue(&mut dash, &mut link, &command).await.unwrap();

        assert_eq!(link.sent.len(), 2);
        assert_eq!(
            link.sent[1],
            ClientMessage::TaskCancel {
                task_uuid: "t1".into()
            }
            .to_json()
            .unwrap()
        );
    }

    #[tokio::test]
    async fn test_command_refused_when_unauthorized() {
        let mut dash = dashboard();
        let mut link = Scripted {
            inbound: VecDeque::from(vec![overview(0)]),
            ..Default::default()
        };
        let command = Command::ResetEvent {
            event_uuid: "e1".into(),
        };

        assert!(issue(&mut dash, &mut link, &command).await.is_err());
        assert_eq!(link.sent.len(), 1);
    }

    #[tokio::test]
    async fn test_close_before_auth_is_an_error() {
        let mut dash = dashboard();
        let mut link = Scripted::default();
        let command = Command::ResetEvent {
            event_uuid: "e1".into(),
        };
        assert!(issue(&mut dash, &mut link, &command).await.is_err());
    }
}
