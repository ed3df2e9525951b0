//! Messaging abstractions: inbound group messages and the outbound port.

pub mod port;
pub mod throttled;
pub mod types;
