//! Layered YAML configuration for the Conduit daemon.
//!
//! See [`loader::load`] for the merge order and [`types::Config`] for the
//! full set of tunables.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod env;
mod error;
mod loader;
mod merge;
pub mod prelude;
mod types;

pub use env::{apply_env_overrides, collect_env_vars};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_from};
pub use merge::deep_merge;
pub use types::{Config, LogFormat, PolicyConfig, PreferredRuntime, RuntimeConfig};
