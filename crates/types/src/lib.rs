pub mod address;
pub mod bytes;
pub mod hash;
pub mod uint;

pub use address::Address;
pub use bytes::Bytes;
pub use hash::{HashExt, H160, H256};
pub use uint::{UintExt, U256};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),
    
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    
    #[error("Invalid address checksum")]
    InvalidChecksum,
}

pub type Result<T> = std::result::Result<T, TypesError>;

/// Decode an optionally `0x`-prefixed hex string.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|_| TypesError::InvalidHex(s.to_string()))
}
