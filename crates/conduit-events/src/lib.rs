//! Event Bus — fans out lifecycle, binding, and policy events to
//! zero-or-more subscribers.
//!
//! Unlike a shared broadcast channel, each subscriber gets its own bounded
//! queue: a slow subscriber whose queue fills up only drops events meant
//! for it, and never blocks the publisher or starves other subscribers
//! (`SPEC_FULL.md` §4.6).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod bus;
mod subscriber;

pub use bus::{EventBus, DEFAULT_QUEUE_CAPACITY};
pub use subscriber::EventReceiver;
