//! # Contract Runtime
//!
//! Hosts one contract in its own process. The binary wires logging and
//! configuration, then hands the contract to [`contract_shim::start`].
//!
//! ## Modules
//!
//! - `asset_ledger/` - the bundled PTN balance ledger contract
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load [`ShimConfig`](contract_shim::config::ShimConfig) from the environment
//! 3. Connect, register and serve until the peer hangs up or Ctrl+C

#![warn(missing_docs)]

pub mod asset_ledger;

pub use asset_ledger::AssetLedger;
