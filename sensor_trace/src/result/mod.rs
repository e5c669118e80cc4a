//! Result module
//!
//! Hit buffers produced by fire calls and the registry that owns them until
//! the host releases their handle.

mod hit_buffer;
mod result_registry;

pub use hit_buffer::HitBuffer;
pub use result_registry::{ResultHandle, ResultRegistry};
