//! Signature validators shipped with the wallet.

use crate::interfaces::{Contract, K1Validator, R1Validator};
use smartwallet_crypto::{recover_address, verify_r1, K1Signature, R1PublicKey};
use smartwallet_types::{Address, H256};
use tracing::trace;

/// secp256r1 validator for keys held in secure enclaves (passkeys, TEE).
/// Expects a 64-byte `r || s` signature over the digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeeValidator;

impl R1Validator for TeeValidator {
    fn validate_signature(&self, signed_hash: &H256, signature: &[u8], public_key: &R1PublicKey) -> bool {
        if signature.len() != 64 {
            trace!(len = signature.len(), "r1 signature has wrong length");
            return false;
        }
        verify_r1(signed_hash, signature, public_key)
    }
}

impl Contract for TeeValidator {
    fn as_r1_validator(&self) -> Option<&dyn R1Validator> {
        Some(self)
    }
}

/// secp256k1 validator for externally owned keys. Expects `r || s || v`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EoaValidator;

impl K1Validator for EoaValidator {
    fn validate_signature(&self, signed_hash: &H256, signature: &[u8]) -> Address {
        K1Signature::from_bytes(signature)
            .and_then(|sig| recover_address(signed_hash, &sig))
            .unwrap_or(Address::ZERO)
    }
}

impl Contract for EoaValidator {
    fn as_k1_validator(&self) -> Option<&dyn K1Validator> {
        Some(self)
    }
}
