//! Core domain types
//!
//! The entities the Sai server pushes to dashboard clients. They are
//! deserialized straight off the wire, so field names follow the server's
//! JSON rather than Rust conventions where the two differ.

pub mod builder;
pub mod event;
pub mod load;
pub mod log;
pub mod power;
pub mod state;
pub mod task;
