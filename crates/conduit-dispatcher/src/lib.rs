//! The Request Dispatcher: binds `{method, params}` requests from the local
//! IPC layer onto the Lifecycle Manager, Policy Engine, and Adapter
//! Registry, and the Unix-domain-socket transport that carries them
//! (`SPEC_FULL.md` §4.7, §10.6).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod dispatcher;
mod socket;
mod wire;

pub use dispatcher::Dispatcher;
pub use socket::{bind, serve, spawn, MAX_FRAME_BYTES};
pub use wire::{DispatchRequest, DispatchResponse, ErrorPayload};
