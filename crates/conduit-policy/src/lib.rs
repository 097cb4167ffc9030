//! The Conduit Policy Engine.
//!
//! Turns a [`Request`] for filesystem/network/secret/exposure capabilities
//! into an ALLOW/WARN/DENY [`conduit_core::PolicyDecision`], combining a
//! non-overridable blocklist with per-instance user grants, and records
//! every decision to the consent ledger.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod blocklist;
mod engine;
pub mod normalize;
mod request;

pub use engine::PolicyEngine;
pub use request::Request;
