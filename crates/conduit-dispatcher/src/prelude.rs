//! Convenience re-export of this crate's public surface.

pub use crate::dispatcher::Dispatcher;
pub use crate::socket::{bind, serve, spawn, MAX_FRAME_BYTES};
pub use crate::wire::{DispatchRequest, DispatchResponse, ErrorPayload};
