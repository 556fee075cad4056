//! Domain entities

mod frame;
mod message;
mod outgoing;
mod user;

pub use frame::{FrameKind, SocketFrame};
pub use message::{Author, ChatEvent, ChatMessage, Extensions, Mention};
pub use outgoing::{Embed, MediaUpload, MediaUploadKind, OutgoingMessage};
pub use user::{LoginResponse, UserProfile};
