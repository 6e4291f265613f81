//! Data Transfer Objects for the dashboard protocol
//!
//! Every frame in either direction is a JSON object carrying a `schema`
//! field naming its type:
//! - `inbound`: pushed by the server to dashboard clients
//! - `outbound`: requests and operator commands sent by the client

pub mod inbound;
pub mod outbound;
