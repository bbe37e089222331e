//! Logging setup for applications embedding the analytics service.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the host. [`init_tracing`] covers the common case.

#[cfg(feature = "logging")]
mod tracing_init;

#[cfg(feature = "logging")]
pub use tracing_init::*;
