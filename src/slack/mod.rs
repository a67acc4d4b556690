//! Slack boundary: Web API client, inbound payload types, and message
//! builders.

pub mod blocks;
pub mod client;
pub mod payloads;
