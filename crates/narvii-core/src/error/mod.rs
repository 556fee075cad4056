//! Domain error types

mod api_error;
mod frame_error;

pub use api_error::{ApiError, ApiResult};
pub use frame_error::FrameError;
