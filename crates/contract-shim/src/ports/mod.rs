//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions at the edges of the shim.
//!
//! - **Driving Ports (Inbound)**: `Contract` (user code the engine drives),
//!   `ContractStub` (what user code may call back into)
//! - **Driven Ports (Outbound)**: `DuplexStream` (the connection to the peer)
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
