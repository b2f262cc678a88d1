//! # Contract Shim - Contract-Side Protocol Engine
//!
//! ## Purpose
//!
//! Lets contract code running in its own process reach the ledger through
//! its host peer. Every state read or write, token payout, cross-chain call
//! or jury poll becomes a request on one bidirectional stream, matched to
//! its reply while any number of other requests share the same stream.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | State machine | `domain/state_machine.rs` | `(state, kind) -> (state, action)` table |
//! | Correlation key | `domain/correlation.rs` | Structured `(channel_id, tx_id)` |
//! | Response router | `adapters/router.rs` | One-shot slot per outstanding request |
//! | Serialized sender | `adapters/sender.rs` | One write on the stream at a time |
//! | Correlator | `adapters/correlator.rs` | Send a request, wait for its reply |
//! | Transports | `adapters/transport/` | In-memory pair, framed TCP |
//! | Operations | `operations.rs` | Typed requests on one generic primitive |
//! | Stub | `stub.rs` | Per-call `ContractStub` handed to user code |
//! | Pipeline | `pipeline.rs` | INIT/TRANSACTION -> COMPLETED/ERROR |
//! | Engine | `engine.rs` | Reader task + serial transition loop |
//! | Certificates | `cert.rs` | Certificate chain validation |
//!
//! ## Ordering Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Writes never interleave | `SerialSender` lock |
//! | Transitions applied one at a time | engine loop is the only state writer |
//! | A call's outcome lands before the next inbound message is handled | biased select on the transition queue |
//! | Blocked calls wake on connection loss | router closed on engine exit |
//!
//! ## Usage Example
//!
//! ```ignore
//! use contract_shim::prelude::*;
//!
//! struct Counter;
//!
//! #[async_trait::async_trait]
//! impl Contract for Counter {
//!     async fn init(&self, _stub: &dyn ContractStub) -> Response {
//!         Response::success(Vec::new())
//!     }
//!
//!     async fn invoke(&self, stub: &dyn ContractStub) -> Response {
//!         match stub.get_state("count").await {
//!             Ok(value) => Response::success(value),
//!             Err(e) => Response::error(e.to_string()),
//!         }
//!     }
//! }
//!
//! contract_shim::start(Arc::new(Counter), ShimConfig::from_env()?).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod cert;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod operations;
pub mod pipeline;
pub mod ports;
pub mod stub;

use std::sync::Arc;
use tracing::info;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::{CorrelationKey, EngineState, Invocation};

    // Ports
    pub use crate::ports::inbound::{Contract, ContractStub, InvokeParameters};
    pub use crate::ports::outbound::DuplexStream;

    // Adapters
    pub use crate::adapters::{Correlator, MemoryStream, ResponseRouter, SerialSender, TcpTransport};

    // Engine
    pub use crate::config::{ConfigError, ShimConfig};
    pub use crate::engine::{Engine, EngineHandle};
    pub use crate::operations::Operations;

    // Certificates
    pub use crate::cert::{CertRejection, CertificateDecoder, CertificateStore, X509Decoder};

    // Errors
    pub use crate::errors::{ShimError, ShimResult, TransportError};

    // Wire types
    pub use shared_types::{Message, MessageKind, Response};
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Connect to the configured peer and serve `contract` until the
/// connection ends.
///
/// # Errors
///
/// Invalid configuration, connection failure, or the transport error that
/// ended the connection.
pub async fn start(contract: Arc<dyn ports::Contract>, config: config::ShimConfig) -> Result<(), errors::ShimError> {
    config.validate()?;

    info!(peer = %config.peer_address, contract = %config.contract_name, "Connecting to peer");
    let transport = adapters::TcpTransport::connect(config.peer_address.as_str(), config.max_frame_bytes).await?;

    let (engine, _handle) = engine::Engine::new(Arc::new(transport), contract, &config);
    engine.run().await
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
