//! HTTP transport

mod client;
pub(crate) mod response;

pub use client::{HttpClient, USER_AGENT};
pub(crate) use response::parse_response;
