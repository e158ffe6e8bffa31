//! Modular smart-account engine: owner, validator, module and hook
//! registries, the transaction authorization pipeline driven by the
//! bootloader, and the contracts that plug into it (validators, recovery
//! modules, paymasters).

pub mod account;
pub mod auth;
pub mod batch;
pub mod bootloader;
pub mod events;
pub mod host;
pub mod interfaces;
pub mod layout;
pub mod managers;
pub mod paymaster;
pub mod recovery;
pub mod validators;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use account::SmartAccount;
pub use auth::CallContext;
pub use batch::BatchCaller;
pub use bootloader::{Bootloader, Receipt, Stage, TransactionFailure};
pub use events::Event;
pub use host::{Host, HostConfig};
pub use interfaces::{
    Contract, ExecutionHook, InterfaceId, K1Validator, Module, Paymaster, R1Validator,
    ValidationHook,
};
pub use managers::{HookManager, ModuleManager, OwnerManager, UpgradeManager, ValidatorManager};
pub use paymaster::{GaslessPaymaster, PaymasterError, PaymasterFlow};
pub use recovery::{CloudRecoveryModule, RecoveryConfig, RecoveryError, SocialRecoveryModule};
pub use validators::{EoaValidator, TeeValidator};

use serde::{Deserialize, Serialize};
use smartwallet_core::CoreError;
use smartwallet_crypto::CryptoError;
use smartwallet_storage::StorageError;
use smartwallet_types::{Address, H256, U256};
use std::fmt;
use thiserror::Error;

/// The two independent signer keyspaces of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyspace {
    /// secp256r1 public keys, 64 bytes `x || y`.
    R1,
    /// secp256k1 signer addresses.
    K1,
}

impl fmt::Display for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyspace::R1 => write!(f, "r1"),
            Keyspace::K1 => write!(f, "k1"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Unauthorized caller {caller}")]
    Unauthorized { caller: Address },
    
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    
    #[error("Invalid address")]
    InvalidAddress,
    
    #[error("Cannot remove the last R1 owner")]
    EmptyR1Owners,
    
    #[error("Cannot remove the last R1 validator")]
    EmptyR1Validators,
    
    #[error("Validator {0} does not support the expected interface")]
    ValidatorErc165Fail(Address),
    
    #[error("Module payload shorter than an address")]
    EmptyModuleAddress,
    
    #[error("Module {0} does not support the module interface")]
    ModuleErc165Fail(Address),
    
    #[error("Hook payload shorter than an address")]
    EmptyHookAddress,
    
    #[error("Hook {0} does not support the hook interface")]
    HookErc165Fail(Address),
    
    #[error("Caller {caller} is not an installed hook")]
    NotFromHook { caller: Address },
    
    #[error("Hook data key {0:?} is reserved")]
    InvalidKey(H256),
    
    #[error("Implementation {0} is already current")]
    SameImplementation(Address),
    
    #[error("Validator {0} is not registered")]
    UnknownValidator(Address),
    
    #[error("Hook data count mismatch: {expected} hooks, {actual} entries")]
    HookDataLengthMismatch { expected: usize, actual: usize },
    
    #[error("Too many hooks: at most {max}")]
    TooManyHooks { max: usize },
    
    #[error("{0} already registered")]
    AlreadyRegistered(&'static str),
    
    #[error("{0} not registered")]
    NotRegistered(&'static str),
    
    #[error("Caller {caller} is not an installed module")]
    NotFromModule { caller: Address },
    
    #[error("Modules cannot call the account through executeFromModule")]
    RecursiveModuleCall,
    
    #[error("Caller {caller} is not the bootloader")]
    NotFromBootloader { caller: Address },
    
    #[error("Nonce mismatch: expected {expected}, got {actual}")]
    NonceMismatch { expected: u64, actual: u64 },
    
    #[error("Signature rejected by validator {validator}")]
    SignatureRejected { validator: Address },
    
    #[error("Validation hook {hook} rejected the transaction")]
    HookRejected { hook: Address },
    
    #[error("Insufficient balance for {address}: have {balance}, need {required}")]
    InsufficientBalance {
        address: Address,
        balance: U256,
        required: U256,
    },
    
    #[error("Account {0} is already processing a transaction")]
    Reentrancy(Address),
    
    #[error("Out of gas: limit {limit}, requested {requested}")]
    OutOfGas { limit: u64, requested: u64 },
    
    #[error("Batch call {index} failed: {reason}")]
    BatchCallFailed { index: usize, reason: String },
    
    #[error("Execution reverted: {0}")]
    Reverted(String),
    
    #[error("Decoding error: {0}")]
    Decoding(String),
    
    #[error("{0} is not a registered implementation")]
    NotAnImplementation(Address),
    
    #[error("Incompatible implementation schema: account has {expected}, target has {actual}")]
    IncompatibleImplementation { expected: u32, actual: u32 },
    
    #[error("Account {0} is already initialized")]
    AlreadyInitialized(Address),
    
    #[error("{0} is not a smart account")]
    NotAnAccount(Address),
    
    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),
    
    #[error("Paymaster error: {0}")]
    Paymaster(#[from] PaymasterError),
    
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
    
    #[error("Core error: {0}")]
    Core(String),
}

impl From<CoreError> for AccountError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OutOfGas { limit, requested } => AccountError::OutOfGas { limit, requested },
            CoreError::Abi(e) => AccountError::Decoding(e.to_string()),
            other => AccountError::Core(other.to_string()),
        }
    }
}

impl From<alloy_sol_types::Error> for AccountError {
    fn from(err: alloy_sol_types::Error) -> Self {
        AccountError::Decoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;
