//! Live dashboard loop
//!
//! Drives the engine from the WebSocket link, its timer deadline and
//! Ctrl-C, one input at a time, and reconnects for as long as it runs.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use sai_client::Transport;
use sai_dashboard::{Dashboard, Effect, PageContext, ReloadReason};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::view::{Mode, View};

/// What the loop does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// The link dropped; wait out the reconnect delay
    Closed,
    /// The reconnect delay is over
    Reconnect,
    Reload(ReloadReason),
    Quit,
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn sleep_until(deadline: Option<i64>) {
    match deadline {
        Some(at) => {
            let wait = u64::try_from(at - now_ms()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Carries out engine effects, returning how the loop has to continue
pub(crate) async fn apply(
    effects: Vec<Effect>,
    mut link: Option<&mut dyn Transport>,
    view: &mut View,
) -> Result<Option<Flow>> {
    let mut flow = None;
    for effect in effects {
        match effect {
            Effect::Send(message) => match link.as_deref_mut() {
                Some(link) => {
                    if let Err(e) = link.send_message(&message).await {
                        warn!("Failed to send {}: {}", message.schema(), e);
                        return Ok(Some(Flow::Closed));
                    }
                }
                None => debug!("No link, dropping {}", message.schema()),
            },
            Effect::LogsFlushed { text } => view.log(&text).context("Failed to write log")?,
            Effect::Reconnect => {
                flow.get_or_insert(Flow::Reconnect);
            }
            Effect::Reload(reason) => flow = Some(Flow::Reload(reason)),
        }
    }
    Ok(flow)
}

/// Runs one connected session until the link drops or the user quits
pub(crate) async fn connected<T: Transport>(
    dash: &mut Dashboard,
    link: &mut T,
    view: &mut View,
) -> Result<Flow> {
    let effects = dash.on_open(now_ms());
    if let Some(flow) = apply(effects, Some(&mut *link as &mut dyn Transport), view).await? {
        return Ok(flow);
    }

    loop {
        let deadline = dash.next_deadline();
        let effects = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(Flow::Quit),
            frame = link.next_text() => match frame {
                Ok(Some(text)) => dash.on_frame(&text, now_ms()),
                Ok(None) => {
                    info!("Server closed the connection");
                    return Ok(Flow::Closed);
                }
                Err(e) => {
                    warn!("Connection lost: {}", e);
                    return Ok(Flow::Closed);
                }
            },
            _ = sleep_until(deadline) => dash.on_timer(now_ms()),
        };
        if let Some(flow) = apply(effects, Some(&mut *link as &mut dyn Transport), view).await? {
            return Ok(flow);
        }
        view.refresh(dash);
    }
}

/// Services timers while there is no link, until the reconnect is due
async fn disconnected(dash: &mut Dashboard, view: &mut View) -> Result<Flow> {
    loop {
        let deadline = dash.next_deadline();
        let effects = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(Flow::Quit),
            _ = sleep_until(deadline) => dash.on_timer(now_ms()),
        };
        if let Some(flow) = apply(effects, None, view).await? {
            return Ok(flow);
        }
        view.refresh(dash);
    }
}

/// Watches a dashboard page until Ctrl-C
pub async fn run(config: &Config, page_url: &str) -> Result<()> {
    let client = config.client(page_url)?;
    let page = PageContext::from_url(client.page_url());
    let mut dash = Dashboard::new(config.dashboard(), page.clone());
    let mut view = View::new(Mode::for_page(&page));
    view.refresh(&dash);

    loop {
        dash.on_connecting();
        let mut flow = match client.connect().await {
            Ok(mut link) => {
                let flow = connected(&mut dash, &mut link, &mut view).await;
                if let Err(e) = link.close().await {
                    debug!("Close failed: {}", e);
                }
                flow?
            }
            Err(e) if e.is_transient() => {
                warn!("Connection to {} failed: {}", client.page_url(), e);
                Flow::Closed
            }
            Err(e) => return Err(e).context("Failed to connect to Sai"),
        };

        if flow == Flow::Closed {
            dash.on_close(now_ms());
            flow = disconnected(&mut dash, &mut view).await?;
        }

        match flow {
            Flow::Quit => return Ok(()),
            Flow::Reload(ReloadReason::VersionSkew) => {
                bail!("Server speaks a different protocol version than this client")
            }
            Flow::Reload(reason) => {
                view.notice(&format!("Reloading ({:?})", reason));
                dash = Dashboard::new(config.dashboard(), page.clone());
                view.reset();
            }
            Flow::Closed | Flow::Reconnect => {}
        }
    }
}
