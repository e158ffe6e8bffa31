pub mod abi;
pub mod gas;
pub mod signature;
pub mod transaction;

pub use gas::{Gas, GasCost};
pub use signature::{MessageSignature, SignatureEnvelope};
pub use transaction::{Transaction, EIP712_TX_TYPE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("ABI error: {0}")]
    Abi(#[from] alloy_sol_types::Error),
    
    #[error("Fee overflow: gas limit {gas_limit} at max fee {max_fee_per_gas}")]
    FeeOverflow {
        gas_limit: u64,
        max_fee_per_gas: smartwallet_types::U256,
    },
    
    #[error("Out of gas: limit {limit}, requested {requested}")]
    OutOfGas { limit: u64, requested: u64 },
    
    #[error("Types error: {0}")]
    Types(#[from] smartwallet_types::TypesError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
