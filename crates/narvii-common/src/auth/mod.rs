//! Authentication utilities

mod session_store;
mod signature;

pub use session_store::{SessionStore, SessionStoreError};
pub use signature::{SignatureError, Signer, DEFAULT_SIGNATURE_KEY, DEFAULT_SIGNATURE_PREFIX};
