//! secp256k1 ("K1") signing and address recovery.

use crate::{CryptoError, Result};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, Secp256k1, SecretKey,
};
use smartwallet_types::{Address, H256};

/// Half of the secp256k1 group order; signatures with a larger `s` are malleable.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// ECDSA signature with recovery ID, laid out as `r || s || v`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct K1Signature {
    pub r: H256,
    pub s: H256,
    pub v: u8,
}

impl K1Signature {
    pub const LEN: usize = 65;
    
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(self.r.as_bytes());
        bytes[32..64].copy_from_slice(self.s.as_bytes());
        bytes[64] = self.v;
        bytes
    }
    
    /// Parses `r || s || v`; `v` may be 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(CryptoError::InvalidSignature);
        }
        
        Ok(K1Signature {
            r: H256::from_slice(&bytes[0..32]),
            s: H256::from_slice(&bytes[32..64]),
            v: bytes[64],
        })
    }
    
    fn recovery_id(&self) -> Result<RecoveryId> {
        let id = match self.v {
            0 | 1 => self.v,
            27 | 28 => self.v - 27,
            _ => return Err(CryptoError::InvalidSignature),
        };
        RecoveryId::from_i32(id as i32).map_err(|_| CryptoError::InvalidSignature)
    }
    
    pub fn is_low_s(&self) -> bool {
        crate::is_low_s(self.s.as_bytes(), &SECP256K1_HALF_ORDER)
    }
}

/// Sign a 32-byte digest. The result always has a low `s` and `v` in {27, 28}.
pub fn sign_hash(hash: &H256, private_key: &SecretKey) -> Result<K1Signature> {
    let secp = Secp256k1::new();
    let message = Message::from_slice(hash.as_bytes())?;
    let (recovery_id, sig_bytes) = secp
        .sign_ecdsa_recoverable(&message, private_key)
        .serialize_compact();
    
    Ok(K1Signature {
        r: H256::from_slice(&sig_bytes[0..32]),
        s: H256::from_slice(&sig_bytes[32..64]),
        v: recovery_id.to_i32() as u8 + 27,
    })
}

/// Recover the signer address. High-`s` signatures are rejected.
pub fn recover_address(hash: &H256, signature: &K1Signature) -> Result<Address> {
    if !signature.is_low_s() {
        return Err(CryptoError::InvalidSignature);
    }
    
    let secp = Secp256k1::new();
    let message = Message::from_slice(hash.as_bytes())?;
    
    let mut compact = [0u8; 64];
    compact[0..32].copy_from_slice(signature.r.as_bytes());
    compact[32..64].copy_from_slice(signature.s.as_bytes());
    
    let recoverable = RecoverableSignature::from_compact(&compact, signature.recovery_id()?)?;
    let public_key = secp.recover_ecdsa(&message, &recoverable)?;
    
    Ok(public_key_to_address(&public_key))
}

/// Convert a public key to an Ethereum address
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = crate::keccak256(&uncompressed[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(out)
}

/// Address controlled by `private_key`.
pub fn address_of(private_key: &SecretKey) -> Address {
    let secp = Secp256k1::new();
    public_key_to_address(&PublicKey::from_secret_key(&secp, private_key))
}

/// Generate a new random private key
pub fn generate_private_key() -> SecretKey {
    SecretKey::new(&mut rand::thread_rng())
}
