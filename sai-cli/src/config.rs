//! Configuration module
//!
//! Dashboard page URL, login cookie and the engine timings, gathered from
//! the command line with environment fallbacks.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use sai_client::SaiClient;
use sai_dashboard::DashboardConfig;
use url::Url;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// The dashboard page every endpoint is derived from
    pub page_url: String,

    /// Session cookie from `sai login`
    pub cookie: Option<String>,

    /// Delay before reconnecting after the link drops
    pub reconnect: Duration,

    /// Delay between the first unflushed log chunk and its output
    pub log_flush: Duration,
}

impl Config {
    /// Creates a configuration with the default timings
    pub fn new(page_url: impl Into<String>) -> Self {
        let defaults = DashboardConfig::default();
        Self {
            page_url: page_url.into(),
            cookie: None,
            reconnect: Duration::from_millis(defaults.reconnect_ms),
            log_flush: Duration::from_millis(defaults.log_flush_ms),
        }
    }

    /// Checks the page URL and timings before anything connects
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.page_url)
            .with_context(|| format!("Invalid page URL '{}'", self.page_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Page URL must be http or https, got '{}'", url.scheme());
        }
        if self.reconnect.is_zero() {
            bail!("Reconnect interval must be nonzero");
        }
        if self.log_flush.is_zero() {
            bail!("Log flush interval must be nonzero");
        }
        Ok(())
    }

    /// Engine tunables for this configuration
    pub fn dashboard(&self) -> DashboardConfig {
        DashboardConfig {
            reconnect_ms: self.reconnect.as_millis() as u64,
            log_flush_ms: self.log_flush.as_millis() as u64,
            ..DashboardConfig::default()
        }
    }

    /// The page URL with its query replaced by one `name=value` pair
    pub fn page_with(&self, name: &str, value: &str) -> Result<String> {
        let mut url = Url::parse(&self.page_url).context("Invalid page URL")?;
        url.query_pairs_mut().clear().append_pair(name, value);
        Ok(url.into())
    }

    /// A client for `page_url`, carrying the login cookie if there is one
    pub fn client(&self, page_url: &str) -> Result<SaiClient> {
        let mut client = SaiClient::new(page_url).context("Failed to create Sai client")?;
        if let Some(cookie) = &self.cookie {
            client.set_cookie(cookie.clone());
        }
        Ok(client)
    }
}
