//! Endpoint implementations of the request gateway port

mod gateway;
pub mod payloads;
