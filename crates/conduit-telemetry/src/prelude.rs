//! Commonly used telemetry types for convenient import.

pub use crate::{RequestContext, RequestGuard, TelemetryError, TelemetryGuard, TelemetryResult, init};
