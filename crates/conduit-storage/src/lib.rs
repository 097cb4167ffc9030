//! Embedded SQL persistence for the Conduit daemon.
//!
//! [`Store`] wraps a single `rusqlite` connection (write-ahead logging, a
//! 5 s busy timeout) behind a mutex and exposes typed accessors for every
//! entity in the data model, plus the append-only consent ledger.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod backups;
mod bindings;
mod db;
mod grants;
mod instances;
mod ledger;
mod migrations;
pub mod prelude;
mod wire;

pub use db::Store;
pub use ledger::LedgerEntry;
