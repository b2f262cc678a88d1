//! # Duplex Stream Adapters
//!
//! | Adapter | Use |
//! |---------|-----|
//! | [`MemoryStream`] | In-process pair for tests and embedders |
//! | [`TcpTransport`] | Length-prefixed frames over TCP to a real peer |

pub mod memory;
pub mod tcp;

pub use memory::MemoryStream;
pub use tcp::TcpTransport;
