//! # narvii-api
//!
//! REST implementation of the [`RequestGateway`](narvii_core::RequestGateway)
//! port: signed JSON requests, community scoping, and typed error mapping.

pub mod endpoints;
pub mod http;

pub use http::{HttpClient, USER_AGENT};
