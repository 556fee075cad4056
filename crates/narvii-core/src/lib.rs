//! # narvii-core
//!
//! Domain layer containing inbound frames, chat events, sessions, and the
//! request gateway port. This crate has zero dependencies on infrastructure
//! (HTTP client, WebSocket transport, filesystem).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Author, ChatEvent, ChatMessage, Embed, Extensions, FrameKind, LoginResponse, MediaUpload,
    MediaUploadKind, Mention, OutgoingMessage, SocketFrame, UserProfile,
};
pub use error::{ApiError, ApiResult, FrameError};
pub use traits::RequestGateway;
pub use value_objects::{MediaKind, MessageKind, Session, SESSION_TTL_HOURS};
