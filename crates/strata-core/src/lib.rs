//! Strata Core - Shared timing for the Strata asset cache
//!
//! This crate provides the fixed-step tick clock that drives cache sweeps:
//! - Tick configuration (step length, delta clamping, time scale)
//! - A clock that turns raw frame deltas into whole-millisecond ticks

pub mod time;

pub use time::{TickClock, TickConfig, TickError};
