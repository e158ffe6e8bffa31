use sha3::{Digest, Keccak256};
use smartwallet_types::H256;
use thiserror::Error;

pub mod secp256k1_crypto;
pub mod secp256r1_crypto;

pub use secp256k1_crypto::*;
pub use secp256r1_crypto::*;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,
    
    #[error("Invalid public key")]
    InvalidPublicKey,
    
    #[error("Invalid private key")]
    InvalidPrivateKey,
    
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    
    #[error("Secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),
    
    #[error("P-256 error: {0}")]
    P256(#[from] p256::ecdsa::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Compute the Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_slice(&hasher.finalize())
}

/// Compute the Keccak-256 hash of multiple slices of data
pub fn keccak256_concat(data: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for slice in data {
        hasher.update(slice);
    }
    H256::from_slice(&hasher.finalize())
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.as_bytes()[..4]);
    out
}

/// Returns true when the big-endian scalar `s` is at most `half_order`.
pub(crate) fn is_low_s(s: &[u8], half_order: &[u8; 32]) -> bool {
    s.len() == 32 && s <= &half_order[..]
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_keccak256_empty() {
        let hash = keccak256(b"");
        let expected = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";
        assert_eq!(format!("{:x}", hash), expected);
    }
    
    #[test]
    fn test_keccak256_concat() {
        let hash1 = keccak256(b"helloworld");
        let hash2 = keccak256_concat(&[b"hello", b"world"]);
        assert_eq!(hash1, hash2);
    }
    
    #[test]
    fn test_selector() {
        // transfer(address,uint256)
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }
}
