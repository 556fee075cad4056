//! Integration test utilities for the bot runtime
//!
//! This crate provides a recording request gateway, chat frame builders, and
//! a local WebSocket server standing in for the platform's socket hosts.

pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
