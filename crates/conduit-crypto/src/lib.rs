//! Conduit Crypto - content hashing for the consent ledger.
//!
//! This crate provides BLAKE3 content hashing used to link consent ledger
//! entries into a verifiable chain (`entry_hash = H(prev_hash ‖
//! canonical(entry))`). Signing and key management are not part of this
//! implementation's scope — see `DESIGN.md` for why.
//!
//! # Example
//!
//! ```
//! use conduit_crypto::ContentHash;
//!
//! let hash = ContentHash::hash(b"important data");
//! println!("Hash: {}", hash.to_hex());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod hash;

pub use hash::ContentHash;
