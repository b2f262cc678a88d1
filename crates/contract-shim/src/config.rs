//! # Shim Configuration
//!
//! All limits have defaults and can be overridden from the environment.
//!
//! | Field | Variable | Default |
//! |-------|----------|---------|
//! | `peer_address` | `CONTRACT_SHIM_PEER_ADDRESS` | `127.0.0.1:7052` |
//! | `contract_name` | `CONTRACT_SHIM_NAME` | `contract` |
//! | `call_timeout` | `CONTRACT_SHIM_CALL_TIMEOUT_MS` | none (`0`) |
//! | `max_frame_bytes` | `CONTRACT_SHIM_MAX_FRAME_BYTES` | 16 MiB |

use std::time::Duration;
use thiserror::Error;

/// Peer address variable.
pub const ENV_PEER_ADDRESS: &str = "CONTRACT_SHIM_PEER_ADDRESS";
/// Contract name variable.
pub const ENV_CONTRACT_NAME: &str = "CONTRACT_SHIM_NAME";
/// Call timeout variable, in milliseconds. `0` disables the timeout.
pub const ENV_CALL_TIMEOUT_MS: &str = "CONTRACT_SHIM_CALL_TIMEOUT_MS";
/// Frame size limit variable.
pub const ENV_MAX_FRAME_BYTES: &str = "CONTRACT_SHIM_MAX_FRAME_BYTES";

/// Runtime configuration of one shim connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// TCP address of the peer's contract endpoint.
    pub peer_address: String,
    /// Name sent with REGISTER.
    pub contract_name: String,
    /// Upper bound on a single operation call. `None` waits until the
    /// connection ends.
    pub call_timeout: Option<Duration>,
    /// Largest frame the TCP transport sends or accepts.
    pub max_frame_bytes: usize,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            peer_address: "127.0.0.1:7052".to_string(),
            contract_name: "contract".to_string(),
            call_timeout: None,
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse.
    #[error("{var}={value:?} is not a valid number")]
    InvalidNumber { var: &'static str, value: String },

    /// A required value is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The frame limit is zero.
    #[error("max_frame_bytes must be positive")]
    ZeroFrameLimit,
}

impl ShimConfig {
    /// Defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// `InvalidNumber` for unparsable numeric variables, then anything
    /// [`validate`](Self::validate) rejects.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// # Errors
    ///
    /// As [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_PEER_ADDRESS) {
            config.peer_address = addr;
        }
        if let Some(name) = lookup(ENV_CONTRACT_NAME) {
            config.contract_name = name;
        }
        if let Some(ms) = lookup(ENV_CALL_TIMEOUT_MS) {
            let ms: u64 = parse(ENV_CALL_TIMEOUT_MS, &ms)?;
            config.call_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(bytes) = lookup(ENV_MAX_FRAME_BYTES) {
            config.max_frame_bytes = parse(ENV_MAX_FRAME_BYTES, &bytes)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Empty address or name, or a zero frame limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_address.trim().is_empty() {
            return Err(ConfigError::Empty("peer_address"));
        }
        if self.contract_name.trim().is_empty() {
            return Err(ConfigError::Empty("contract_name"));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::ZeroFrameLimit);
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}
