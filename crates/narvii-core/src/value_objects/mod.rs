//! Value objects - immutable types defined by their values

mod kinds;
mod session;

pub use kinds::{MediaKind, MessageKind};
pub use session::{Session, SESSION_TTL_HOURS};
