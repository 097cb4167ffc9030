//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conduit_lifecycle::prelude::*;` to import all essential types.

pub use crate::{LifecycleManager, OperationTracker};
