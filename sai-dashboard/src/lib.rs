//! Sai Dashboard Engine
//!
//! The reconciliation and rendering engine behind the Sai live dashboard.
//! It is sans-IO: the caller feeds it decoded-text frames from the server,
//! connection lifecycle notifications, operator commands and clock readings,
//! and gets back a list of [`Effect`]s to carry out (frames to send, page
//! reloads, reconnects, log output).
//!
//! All state the dashboard shows lives in a [`UiTree`], a keyed node arena
//! that stands in for a browser DOM. Entities are reconciled into it in place
//! so that node identity survives updates.
//!
//! # Example
//!
//! ```
//! use sai_dashboard::{Dashboard, DashboardConfig, Effect, PageContext};
//!
//! let page = PageContext::parse("https://ci.example.com/sai/").unwrap();
//! let mut dash = Dashboard::new(DashboardConfig::default(), page);
//!
//! // The first thing on a fresh connection is the overview request
//! let effects = dash.on_open(0);
//! assert!(matches!(effects.as_slice(), [Effect::Send(_)]));
//! ```

pub mod age;
pub mod commands;
pub mod dashboard;
pub mod format;
pub mod i18n;
pub mod logs;
pub mod page;
pub mod progress;
pub mod reconciler;
pub mod router;
pub mod session;
pub mod timers;
pub mod topology;
pub mod tree;

pub use commands::Command;
pub use dashboard::Dashboard;
pub use logs::{FollowingViewport, Viewport};
pub use page::PageContext;
pub use router::FrameError;
pub use tree::{NodeId, UiTree};

use sai_core::JS_API_VERSION;
use sai_core::dto::outbound::ClientMessage;

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Protocol version this client speaks; frames from any other version
    /// force a reload
    pub api_version: u32,
    /// Delay between the first unflushed log chunk and the redraw
    pub log_flush_ms: u64,
    /// Fixed delay before reconnecting after the connection drops
    pub reconnect_ms: u64,
    /// Delay between sending an event delete and reloading the page
    pub delete_reload_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_version: JS_API_VERSION,
            log_flush_ms: 500,
            reconnect_ms: 4_000,
            delete_reload_ms: 750,
        }
    }
}

/// Why the engine wants the page reloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    /// The server speaks a different protocol version
    VersionSkew,
    /// The server refused this client
    Unauthorized,
    /// The login session ran out
    SessionExpired,
    /// An event was deleted and the server has had time to process it
    EventDeleted,
}

/// Something the driver of the engine has to carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send this message on the open connection
    Send(ClientMessage),
    /// Throw away all state and start over, as a browser page reload would
    Reload(ReloadReason),
    /// Open a new connection; the reconnect delay has elapsed
    Reconnect,
    /// Log output was flushed to the view; `text` is the plain text that
    /// became visible since the previous flush
    LogsFlushed { text: String },
}
