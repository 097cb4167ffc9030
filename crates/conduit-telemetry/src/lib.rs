//! Logging and request-correlation setup for the Conduit daemon.
//!
//! # Example
//!
//! ```rust,no_run
//! use conduit_telemetry::prelude::*;
//! use conduit_config::Config;
//!
//! # fn main() -> TelemetryResult<()> {
//! let config = Config::default();
//! let _guard = init(&config)?;
//!
//! let ctx = RequestContext::new("dispatcher").with_method("instance.start");
//! let _entered = ctx.enter();
//! tracing::info!("handling request");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{TelemetryGuard, init};
