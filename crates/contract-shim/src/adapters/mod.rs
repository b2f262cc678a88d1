//! # Adapters Layer (Outer Hexagon)
//!
//! | Adapter | Role |
//! |---------|------|
//! | [`router::ResponseRouter`] | Correlation table of outstanding requests |
//! | [`sender::SerialSender`] | Serializes every write onto the stream |
//! | [`correlator::Correlator`] | Send-and-wait on top of the two above |
//! | [`transport`] | `DuplexStream` implementations |

pub mod correlator;
pub mod router;
pub mod sender;
pub mod transport;

pub use correlator::Correlator;
pub use router::{ResponseRouter, ResponseSlot};
pub use sender::SerialSender;
pub use transport::{MemoryStream, TcpTransport};
