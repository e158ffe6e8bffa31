use crate::{Result, TypesError, H160, H256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(H160);

impl Address {
    pub const ZERO: Address = Address(H160::zero());
    
    pub const LEN: usize = 20;
    
    pub fn zero() -> Self {
        Self::ZERO
    }
    
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
    
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != Self::LEN {
            return Err(TypesError::InvalidLength {
                expected: Self::LEN,
                actual: slice.len(),
            });
        }
        Ok(Address(H160::from_slice(slice)))
    }
    
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(H160::from(bytes))
    }
    
    /// Builds a deterministic address from a small integer, used for system
    /// contracts that live at fixed low addresses.
    pub fn from_low_u64_be(value: u64) -> Self {
        Address(H160::from_low_u64_be(value))
    }
    
    /// Takes the low 20 bytes of an ABI word.
    pub fn from_word(word: &H256) -> Self {
        Address(H160::from_slice(&word.as_bytes()[12..]))
    }
    
    /// Left-pads the address into an ABI word.
    pub fn to_word(&self) -> H256 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(self.0.as_bytes());
        H256::from(word)
    }
    
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
    
    pub fn to_bytes(&self) -> [u8; 20] {
        self.0.to_fixed_bytes()
    }
    
    /// EIP-55 mixed-case representation.
    pub fn checksum(&self) -> String {
        alloy_primitives::Address::from(*self).to_checksum(None)
    }
}

impl FromStr for Address {
    type Err = TypesError;
    
    fn from_str(s: &str) -> Result<Self> {
        let bytes = crate::decode_hex(s)?;
        let addr = Address::from_slice(&bytes)?;
        
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mixed_case = digits.chars().any(|c| c.is_ascii_uppercase())
            && digits.chars().any(|c| c.is_ascii_lowercase());
        if mixed_case && addr.checksum().trim_start_matches("0x") != digits {
            return Err(TypesError::InvalidChecksum);
        }
        
        Ok(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.checksum())
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:x}", self))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<H160> for Address {
    fn from(hash: H160) -> Self {
        Address(hash)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address::from_bytes(bytes)
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(addr: alloy_primitives::Address) -> Self {
        Address::from_bytes(addr.0 .0)
    }
}

impl From<Address> for alloy_primitives::Address {
    fn from(addr: Address) -> Self {
        alloy_primitives::Address::from(addr.to_bytes())
    }
}
