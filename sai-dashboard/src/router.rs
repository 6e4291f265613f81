//! Frame decoding and classification
//!
//! Decoding happens in two passes over the same JSON value: the envelope
//! first, so a frame from a different protocol version is rejected before
//! its body is even looked at, then the body into a [`ServerMessage`].

use sai_core::dto::inbound::{Envelope, ServerMessage};
use serde::Deserialize;
use thiserror::Error;

use crate::page::PageContext;
use crate::reconciler::keys;
use crate::tree::UiTree;

/// Why a frame could not be used
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not JSON, or not an object
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that does not fit its schema
    #[error("frame does not match schema '{schema}': {source}")]
    Schema {
        schema: String,
        source: serde_json::Error,
    },

    /// A log chunk whose payload is not base64
    #[error("log payload is not base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result of decoding one frame
#[derive(Debug)]
pub enum Decoded {
    /// The server runs a different protocol version; nothing else may
    /// happen with this frame
    VersionSkew { server: u64 },
    Message {
        envelope: Envelope,
        message: ServerMessage,
    },
}

pub fn decode(frame: &str, api_version: u32) -> Result<Decoded, FrameError> {
    let value: serde_json::Value = serde_json::from_str(frame)?;
    let envelope = Envelope::deserialize(&value)?;
    if let Some(server) = envelope.api_version.filter(|v| *v != u64::from(api_version)) {
        return Ok(Decoded::VersionSkew { server });
    }

    let schema = value
        .get("schema")
        .and_then(|s| s.as_str())
        .unwrap_or_default()
        .to_string();
    let message = ServerMessage::deserialize(value)
        .map_err(|source| FrameError::Schema { schema, source })?;
    Ok(Decoded::Message { envelope, message })
}

/// Which handler a message goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Render the whole events list afresh
    OverviewSnapshot,
    /// Patch the one event already on screen
    OverviewDelta,
    /// The task is on screen as an inline indicator
    TaskIndicator,
    /// The task is on screen as an expanded detail panel
    TaskPanel,
    /// The page is about this task but it is not rendered yet
    TaskDetail,
    /// Nothing on screen cares about this task
    TaskUnseen,
    BuilderFleet,
    PowerTopology,
    LoadReport,
    LogChunk,
    Artifact,
    Activity,
    Unauthorized,
    Ignored,
}

/// Classifies a message against what the tree currently shows
pub fn classify(message: &ServerMessage, tree: &UiTree, page: &PageContext) -> Route {
    match message {
        ServerMessage::Overview(ov) => match ov.overview.as_slice() {
            [only] if tree.by_key(&keys::event(&only.e.uuid)).is_some() => Route::OverviewDelta,
            _ => Route::OverviewSnapshot,
        },
        ServerMessage::TaskInfo(info) => {
            let uuid = &info.t.uuid;
            if tree.by_key(&keys::task(uuid)).is_some() {
                Route::TaskIndicator
            } else if tree.by_key(&keys::task_panel(uuid)).is_some() {
                Route::TaskPanel
            } else if page.task.as_deref() == Some(uuid.as_str()) {
                Route::TaskDetail
            } else {
                Route::TaskUnseen
            }
        }
        ServerMessage::Builders(_) => Route::BuilderFleet,
        ServerMessage::PowerTopology(_) => Route::PowerTopology,
        ServerMessage::LoadReport(_) => Route::LoadReport,
        ServerMessage::Log(_) => Route::LogChunk,
        ServerMessage::Artifact(_) => Route::Artifact,
        ServerMessage::TaskActivity(_) => Route::Activity,
        ServerMessage::Unauthorized => Route::Unauthorized,
        ServerMessage::Unknown => Route::Ignored,
    }
}
