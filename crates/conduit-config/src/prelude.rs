//! Commonly used configuration types and functions.
//!
//! ```no_run
//! use conduit_config::prelude::*;
//!
//! let config = load()?;
//! # Ok::<(), ConfigError>(())
//! ```

pub use crate::{Config, ConfigError, ConfigResult, LogFormat, PreferredRuntime, load};
