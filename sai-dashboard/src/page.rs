//! What the page being shown is about

use sai_core::dto::outbound::ClientMessage;
use url::Url;

/// Query-derived view of the dashboard page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageContext {
    /// `?task=` the page is dedicated to
    pub task: Option<String>,
    /// `?event=` the page is dedicated to
    pub event: Option<String>,
    /// Project from a `/git/<project>` path, when embedded in a git browser
    pub project: Option<String>,
}

impl PageContext {
    pub fn parse(page_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(&Url::parse(page_url)?))
    }

    pub fn from_url(url: &Url) -> Self {
        let query = |name: &str| {
            url.query_pairs()
                .find(|(k, v)| k == name && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        };
        let project = url
            .path()
            .split_once("/git/")
            .and_then(|(_, rest)| rest.split('/').next())
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Self {
            task: query("task"),
            event: query("event"),
            project,
        }
    }

    pub fn is_task_view(&self) -> bool {
        self.task.is_some()
    }

    /// True when the page is embedded in a git browser, which hides the
    /// event-wide operator actions
    pub fn is_git_integrated(&self) -> bool {
        self.project.is_some()
    }

    /// The first request on a fresh connection
    ///
    /// Task pages resume their log stream from `last_log_ts`.
    pub fn initial_request(&self, api_version: u32, last_log_ts: u64) -> ClientMessage {
        if let Some(task) = &self.task {
            return ClientMessage::task_detail(api_version, task, last_log_ts);
        }
        if let Some(event) = &self.event {
            return ClientMessage::event_detail(api_version, event);
        }
        ClientMessage::overview(api_version)
    }
}
