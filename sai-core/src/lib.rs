//! Sai Core
//!
//! Core types for the Sai dashboard client.
//!
//! This crate contains:
//! - Domain types: the entities the server pushes (Event, Task, Builder, ...)
//! - DTOs: the inbound push protocol and the outbound command messages

pub mod domain;
pub mod dto;
mod serde_ext;

/// Protocol version this client speaks.
///
/// Sent as `js_api_version` on every request and compared against the
/// `api_version` the server stamps on its frames.
pub const JS_API_VERSION: u32 = 3;
