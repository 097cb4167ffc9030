//! Commonly used storage types for convenient import.

pub use crate::{LedgerEntry, Store};
