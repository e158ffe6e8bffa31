use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

/// Owned byte string, serialized as `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Bytes(Vec::new())
    }
    
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Bytes(vec)
    }
    
    pub fn from_slice(slice: &[u8]) -> Self {
        Bytes(slice.to_vec())
    }
    
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
    
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
    
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Deref for Bytes {
    type Target = [u8];
    
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Bytes::from_vec(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Bytes::from_slice(slice)
    }
}

impl From<alloy_primitives::Bytes> for Bytes {
    fn from(bytes: alloy_primitives::Bytes) -> Self {
        Bytes(bytes.to_vec())
    }
}

impl From<Bytes> for alloy_primitives::Bytes {
    fn from(bytes: Bytes) -> Self {
        alloy_primitives::Bytes::from(bytes.0)
    }
}

impl fmt::LowerHex for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:x}", self))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::decode_hex(&s)
            .map(Bytes)
            .map_err(serde::de::Error::custom)
    }
}
