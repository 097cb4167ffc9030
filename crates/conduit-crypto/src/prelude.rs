//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conduit_crypto::prelude::*;` to import all essential types.

// Hashing
pub use crate::ContentHash;
