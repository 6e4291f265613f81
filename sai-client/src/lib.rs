//! Sai Client
//!
//! Transport for the Sai dashboard: derives the server endpoints from a
//! dashboard page URL, opens the WebSocket link with the Sai sub-protocol
//! and posts the login form.
//!
//! # Example
//!
//! ```no_run
//! use sai_client::{SaiClient, Transport};
//! use sai_core::dto::outbound::ClientMessage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SaiClient::new("https://ci.example.com/sai/")?;
//!     let mut link = client.connect().await?;
//!     link.send_message(&ClientMessage::overview(sai_core::JS_API_VERSION)).await?;
//!
//!     while let Some(frame) = link.next_text().await? {
//!         println!("{frame}");
//!     }
//!     Ok(())
//! }
//! ```

mod connection;
pub mod endpoint;
pub mod error;
mod login;

pub use connection::{Transport, WsTransport};
pub use error::{ClientError, Result};
pub use login::cookie_header;

use reqwest::Client;
use reqwest::redirect::Policy;
use url::Url;

/// Client for one Sai dashboard page
///
/// Holds the page URL every endpoint is derived from and, after
/// [`SaiClient::login`], the session cookie presented on connect.
#[derive(Debug, Clone)]
pub struct SaiClient {
    page_url: Url,
    http: Client,
    cookie: Option<String>,
}

impl SaiClient {
    /// Create a client for a dashboard page
    ///
    /// # Arguments
    /// * `page_url` - The dashboard page (e.g., "https://ci.example.com/sai/")
    pub fn new(page_url: &str) -> Result<Self> {
        // Login answers with a redirect carrying the cookie; it must not be followed
        let http = Client::builder().redirect(Policy::none()).build()?;
        Self::with_client(page_url, http)
    }

    /// Create a client with a custom HTTP client for the login post
    pub fn with_client(page_url: &str, http: Client) -> Result<Self> {
        let page_url = Url::parse(page_url)?;
        // Validate early so a bad URL fails before any IO
        endpoint::browse_url(&page_url)?;
        Ok(Self {
            page_url,
            http,
            cookie: None,
        })
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// The WebSocket endpoint for this page
    pub fn browse_url(&self) -> Result<Url> {
        endpoint::browse_url(&self.page_url)
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Use an existing session cookie instead of logging in
    pub fn set_cookie(&mut self, cookie: impl Into<String>) {
        self.cookie = Some(cookie.into());
    }

    /// Open the live link
    pub async fn connect(&self) -> Result<WsTransport> {
        let url = self.browse_url()?;
        WsTransport::connect(&url, self.cookie.as_deref()).await
    }
}
