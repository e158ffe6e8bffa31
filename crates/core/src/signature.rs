//! Wire formats of the signature blobs the account accepts.

use crate::Result;
use alloy_primitives::{Address as AlloyAddress, Bytes as AlloyBytes};
use alloy_sol_types::SolValue;
use smartwallet_types::{Address, Bytes};

/// `abi.encode(bytes signature, address validator, bytes[] hookData)`, the
/// content of a transaction's `signature` field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureEnvelope {
    pub signature: Bytes,
    pub validator: Address,
    pub hook_data: Vec<Bytes>,
}

impl SignatureEnvelope {
    pub fn new(signature: impl Into<Bytes>, validator: Address, hook_data: Vec<Bytes>) -> Self {
        Self {
            signature: signature.into(),
            validator,
            hook_data,
        }
    }
    
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (signature, validator, hook_data) =
            <(AlloyBytes, AlloyAddress, Vec<AlloyBytes>)>::abi_decode_params(data, true)?;
        Ok(Self {
            signature: signature.into(),
            validator: validator.into(),
            hook_data: hook_data.into_iter().map(Bytes::from).collect(),
        })
    }
    
    pub fn encode(&self) -> Bytes {
        let hook_data: Vec<AlloyBytes> = self.hook_data.iter().cloned().map(Into::into).collect();
        let params = (
            AlloyBytes::from(self.signature.clone()),
            AlloyAddress::from(self.validator),
            hook_data,
        );
        Bytes::from_vec(params.abi_encode_params())
    }
}

/// `abi.encode(bytes signature, address validator)`, the blob passed to
/// `isValidSignature`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageSignature {
    pub signature: Bytes,
    pub validator: Address,
}

impl MessageSignature {
    pub fn new(signature: impl Into<Bytes>, validator: Address) -> Self {
        Self {
            signature: signature.into(),
            validator,
        }
    }
    
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (signature, validator) = <(AlloyBytes, AlloyAddress)>::abi_decode_params(data, true)?;
        Ok(Self {
            signature: signature.into(),
            validator: validator.into(),
        })
    }
    
    pub fn encode(&self) -> Bytes {
        let params = (
            AlloyBytes::from(self.signature.clone()),
            AlloyAddress::from(self.validator),
        );
        Bytes::from_vec(params.abi_encode_params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_envelope_layout() {
        let envelope = SignatureEnvelope::new(
            vec![0x11u8; 64],
            Address::from_low_u64_be(0x8001),
            vec![Bytes::from_vec(vec![0x01]), Bytes::new()],
        );
        let encoded = envelope.encode();
        
        // three head words: offset(signature), validator, offset(hookData)
        assert_eq!(encoded[31], 0x60);
        assert_eq!(&encoded[44..64], envelope.validator.as_bytes());
        assert_eq!(SignatureEnvelope::decode(&encoded).unwrap(), envelope);
    }
    
    #[test]
    fn test_envelope_rejects_garbage() {
        assert!(SignatureEnvelope::decode(&[]).is_err());
        assert!(SignatureEnvelope::decode(&[0u8; 64]).is_err());
        assert!(SignatureEnvelope::decode(&[0xffu8; 96]).is_err());
    }
    
    #[test]
    fn test_message_signature() {
        let sig = MessageSignature::new(vec![7u8; 65], Address::from_low_u64_be(3));
        let encoded = sig.encode();
        assert_eq!(MessageSignature::decode(&encoded).unwrap(), sig);
        assert!(MessageSignature::decode(&encoded[..40]).is_err());
    }
}
