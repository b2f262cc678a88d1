//! # Domain Layer (Inner Hexagon)
//!
//! Pure protocol logic: correlation keys and the lifecycle transition table.
//! NO I/O, NO async.

pub mod correlation;
pub mod state_machine;

pub use correlation::*;
pub use state_machine::*;
