//! Outbound socket protocol
//!
//! Frames the client writes to the socket. Inbound frames are modelled in
//! `narvii_core::SocketFrame`.

mod messages;
mod signals;

pub use messages::OutgoingFrame;
pub use signals::{SignalAction, SignalPhase, SocketSignal};
