//! # Asset Ledger Contract
//!
//! Keeps per-address PTN balances in contract state. Balances are stored as
//! decimal strings under `balance_<address>`; an absent key is a zero
//! balance.
//!
//! | Function | Arguments | Effect |
//! |----------|-----------|--------|
//! | `deposit` | - | credit the caller with the PTN attached to the call |
//! | `withdraw` | amount | debit the caller and pay the amount out |
//! | `transfer` | to, amount | move balance from the caller to `to` |
//! | `balance` | [address] | balance of `address`, default the caller |
//! | `owner` | - | address that instantiated the contract |

use async_trait::async_trait;
use contract_shim::errors::ShimError;
use contract_shim::ports::{Contract, ContractStub};
use shared_types::{AmountAsset, Asset, Response};
use thiserror::Error;
use tracing::{debug, warn};

/// Asset the ledger accounts in.
pub const NATIVE_ASSET: &str = "PTN";

/// State key holding the instantiating address.
pub const OWNER_KEY: &str = "owner";

/// State key holding the balance of `address`.
pub fn balance_key(address: &str) -> String {
    format!("balance_{address}")
}

/// Why a ledger call was refused.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No such function.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of parameters.
    #[error("{function} expects {expected} argument(s), got {got}")]
    Arity {
        /// Function called.
        function: &'static str,
        /// Parameters it takes.
        expected: usize,
        /// Parameters supplied.
        got: usize,
    },

    /// Amount is not a positive integer.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The caller cannot cover the amount.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Current balance.
        have: u64,
        /// Amount requested.
        need: u64,
    },

    /// A deposit carried no PTN.
    #[error("no PTN attached to deposit")]
    EmptyDeposit,

    /// The credit would overflow.
    #[error("balance overflow for {0}")]
    Overflow(String),

    /// Stored balance is not a decimal integer.
    #[error("corrupt balance for {0}")]
    CorruptBalance(String),

    /// The host peer refused or the connection failed.
    #[error(transparent)]
    Shim(#[from] ShimError),
}

/// The bundled ledger contract.
#[derive(Debug, Default)]
pub struct AssetLedger;

#[async_trait]
impl Contract for AssetLedger {
    async fn init(&self, stub: &dyn ContractStub) -> Response {
        let owner = match stub.invoke_address() {
            Ok(owner) => owner,
            Err(e) => return Response::error(e.to_string()),
        };
        match stub.put_state(OWNER_KEY, owner.as_bytes()).await {
            Ok(()) => Response::success(owner.into_bytes()),
            Err(e) => Response::error(e.to_string()),
        }
    }

    async fn invoke(&self, stub: &dyn ContractStub) -> Response {
        match dispatch(stub).await {
            Ok(payload) => Response::success(payload),
            Err(e) => {
                warn!(tx = %stub.tx_id(), error = %e, "Ledger call refused");
                Response::error(e.to_string())
            }
        }
    }
}

async fn dispatch(stub: &dyn ContractStub) -> Result<Vec<u8>, LedgerError> {
    let (function, params) = stub.function_and_parameters();
    debug!(tx = %stub.tx_id(), function = %function, "Ledger call");

    match function.as_str() {
        "deposit" => {
            arity("deposit", &params, 0)?;
            deposit(stub).await
        }
        "withdraw" => {
            arity("withdraw", &params, 1)?;
            withdraw(stub, parse_amount(&params[0])?).await
        }
        "transfer" => {
            arity("transfer", &params, 2)?;
            transfer(stub, &params[0], parse_amount(&params[1])?).await
        }
        "balance" => {
            let address = match params.first() {
                Some(address) => address.clone(),
                None => stub.invoke_address()?,
            };
            Ok(read_balance(stub, &address).await?.to_string().into_bytes())
        }
        "owner" => Ok(stub.get_state(OWNER_KEY).await?),
        _ => Err(LedgerError::UnknownFunction(function)),
    }
}

async fn deposit(stub: &dyn ContractStub) -> Result<Vec<u8>, LedgerError> {
    let caller = stub.invoke_address()?;
    let attached = stub
        .invoke_tokens()?
        .iter()
        .filter(|t| t.asset.asset_id == NATIVE_ASSET)
        .try_fold(0u64, |sum, t| sum.checked_add(t.amount))
        .ok_or_else(|| LedgerError::Overflow(caller.clone()))?;
    if attached == 0 {
        return Err(LedgerError::EmptyDeposit);
    }

    let balance = credit(stub, &caller, attached).await?;
    stub.set_event("deposit", format!("{caller}:{attached}").as_bytes())?;
    Ok(balance.to_string().into_bytes())
}

async fn withdraw(stub: &dyn ContractStub, amount: u64) -> Result<Vec<u8>, LedgerError> {
    let caller = stub.invoke_address()?;
    let balance = debit(stub, &caller, amount).await?;

    let payout = AmountAsset {
        amount,
        asset: Asset::new(NATIVE_ASSET),
    };
    stub.pay_out_token(&caller, &payout, 0).await?;
    Ok(balance.to_string().into_bytes())
}

async fn transfer(stub: &dyn ContractStub, to: &str, amount: u64) -> Result<Vec<u8>, LedgerError> {
    let caller = stub.invoke_address()?;
    if to == caller {
        return Ok(read_balance(stub, &caller).await?.to_string().into_bytes());
    }

    let remaining = debit(stub, &caller, amount).await?;
    credit(stub, to, amount).await?;
    stub.set_event("transfer", format!("{caller}>{to}:{amount}").as_bytes())?;
    Ok(remaining.to_string().into_bytes())
}

// =============================================================================
// BALANCES
// =============================================================================

async fn read_balance(stub: &dyn ContractStub, address: &str) -> Result<u64, LedgerError> {
    let raw = stub.get_state(&balance_key(address)).await?;
    if raw.is_empty() {
        return Ok(0);
    }
    std::str::from_utf8(&raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| LedgerError::CorruptBalance(address.to_owned()))
}

async fn write_balance(stub: &dyn ContractStub, address: &str, balance: u64) -> Result<(), LedgerError> {
    stub.put_state(&balance_key(address), balance.to_string().as_bytes())
        .await
        .map_err(LedgerError::from)
}

async fn credit(stub: &dyn ContractStub, address: &str, amount: u64) -> Result<u64, LedgerError> {
    let balance = read_balance(stub, address)
        .await?
        .checked_add(amount)
        .ok_or_else(|| LedgerError::Overflow(address.to_owned()))?;
    write_balance(stub, address, balance).await?;
    Ok(balance)
}

async fn debit(stub: &dyn ContractStub, address: &str, amount: u64) -> Result<u64, LedgerError> {
    let have = read_balance(stub, address).await?;
    let balance = have
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientBalance { have, need: amount })?;
    write_balance(stub, address, balance).await?;
    Ok(balance)
}

fn arity(function: &'static str, params: &[String], expected: usize) -> Result<(), LedgerError> {
    if params.len() == expected {
        Ok(())
    } else {
        Err(LedgerError::Arity {
            function,
            expected,
            got: params.len(),
        })
    }
}

fn parse_amount(raw: &str) -> Result<u64, LedgerError> {
    match raw.parse::<u64>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(LedgerError::InvalidAmount(raw.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("42").unwrap(), 42);
        assert!(matches!(parse_amount("0"), Err(LedgerError::InvalidAmount(_))));
        assert!(matches!(parse_amount("-3"), Err(LedgerError::InvalidAmount(_))));
        assert!(matches!(parse_amount("ten"), Err(LedgerError::InvalidAmount(_))));
    }

    #[test]
    fn test_arity_message() {
        let err = arity("transfer", &["P1x".to_string()], 2).unwrap_err();
        assert_eq!(err.to_string(), "transfer expects 2 argument(s), got 1");
    }

    #[test]
    fn test_balance_key() {
        assert_eq!(balance_key("P1abc"), "balance_P1abc");
    }
}
