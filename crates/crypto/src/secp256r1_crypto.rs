//! secp256r1 ("R1", P-256) keys and signatures over prehashed digests.

use crate::{CryptoError, Result};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use smartwallet_types::H256;
use std::fmt;

/// Uncompressed P-256 point without the SEC1 tag: `x || y`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct R1PublicKey([u8; 64]);

impl R1PublicKey {
    pub const LEN: usize = 64;
    
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; 64];
        key.copy_from_slice(bytes);
        Ok(R1PublicKey(key))
    }
    
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
    
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
    
    /// The `bytes32[2]` words handed to R1 validators.
    pub fn words(&self) -> [H256; 2] {
        [H256::from_slice(&self.0[..32]), H256::from_slice(&self.0[32..])]
    }
    
    fn verifying_key(&self) -> Result<VerifyingKey> {
        let mut sec1 = [0u8; 65];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(&self.0);
        VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| CryptoError::InvalidPublicKey)
    }
}

impl fmt::Debug for R1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R1PublicKey(0x{})", hex_prefix(&self.0))
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes[..6].iter().map(|b| format!("{:02x}", b)).collect::<String>() + ".."
}

/// Verify a 64-byte `r || s` signature over a 32-byte digest.
///
/// Malformed signatures, high-s signatures and points that are not on the
/// curve verify as false.
pub fn verify_r1(hash: &H256, signature: &[u8], public_key: &R1PublicKey) -> bool {
    let signature = match Signature::from_slice(signature) {
        Ok(signature) => signature,
        Err(_) => return false,
    };
    if signature.normalize_s().is_some() {
        return false;
    }
    match public_key.verifying_key() {
        Ok(key) => key.verify_prehash(hash.as_bytes(), &signature).is_ok(),
        Err(_) => false,
    }
}

/// P-256 signing key, used by key generation and tests.
#[derive(Clone)]
pub struct R1SigningKey(SigningKey);

impl R1SigningKey {
    pub fn random() -> Self {
        R1SigningKey(SigningKey::random(&mut rand::rngs::OsRng))
    }
    
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        SigningKey::from_slice(bytes)
            .map(R1SigningKey)
            .map_err(|_| CryptoError::InvalidPrivateKey)
    }
    
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
    
    pub fn public_key(&self) -> R1PublicKey {
        let point = self.0.verifying_key().to_encoded_point(false);
        let mut key = [0u8; 64];
        key.copy_from_slice(&point.as_bytes()[1..]);
        R1PublicKey(key)
    }
    
    /// Sign a 32-byte digest, returning `r || s` with a low `s`.
    pub fn sign_hash(&self, hash: &H256) -> Result<[u8; 64]> {
        let signature: Signature = self.0.sign_prehash(hash.as_bytes())?;
        let signature = signature.normalize_s().unwrap_or(signature);
        let mut out = [0u8; 64];
        out.copy_from_slice(&signature.to_bytes());
        Ok(out)
    }
}

impl fmt::Debug for R1SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("R1SigningKey").field(&self.public_key()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartwallet_types::U256;
    
    #[test]
    fn test_sign_and_verify() {
        let key = R1SigningKey::random();
        let hash = H256::repeat_byte(0x42);
        let signature = key.sign_hash(&hash).unwrap();
        
        assert!(verify_r1(&hash, &signature, &key.public_key()));
        assert!(!verify_r1(&H256::repeat_byte(0x43), &signature, &key.public_key()));
    }
    
    #[test]
    fn test_wrong_key_fails() {
        let hash = H256::repeat_byte(0x01);
        let signature = R1SigningKey::random().sign_hash(&hash).unwrap();
        assert!(!verify_r1(&hash, &signature, &R1SigningKey::random().public_key()));
    }
    
    #[test]
    fn test_malformed_inputs_fail_closed() {
        let key = R1SigningKey::random();
        let hash = H256::repeat_byte(0x07);
        assert!(!verify_r1(&hash, &[0u8; 63], &key.public_key()));
        
        let off_curve = R1PublicKey::from_slice(&[1u8; 64]).unwrap();
        let signature = key.sign_hash(&hash).unwrap();
        assert!(!verify_r1(&hash, &signature, &off_curve));
    }
    
    #[test]
    fn test_high_s_rejected() {
        let order = U256::from_str_radix(
            "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551",
            16,
        )
        .unwrap();
        let key = R1SigningKey::random();
        let hash = H256::repeat_byte(0x0b);
        let signature = key.sign_hash(&hash).unwrap();
        
        let s = U256::from_big_endian(&signature[32..]);
        let mut malleated = signature;
        (order - s).to_big_endian(&mut malleated[32..]);
        
        assert!(verify_r1(&hash, &signature, &key.public_key()));
        assert!(!verify_r1(&hash, &malleated, &key.public_key()));
    }
    
    #[test]
    fn test_key_length() {
        assert!(matches!(
            R1PublicKey::from_slice(&[0u8; 65]),
            Err(CryptoError::InvalidKeyLength { expected: 64, actual: 65 })
        ));
    }
}
