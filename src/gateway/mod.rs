//! Outbound gateway integration.

pub mod client;

pub use client::{GatewayClient, InitiateRequest, InitiateResponse, PollTransport};
