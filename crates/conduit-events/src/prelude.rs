//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conduit_events::prelude::*;` to import all essential types.

pub use crate::{EventBus, EventReceiver, DEFAULT_QUEUE_CAPACITY};
