use primitive_types::{H160 as PrimitiveH160, H256 as PrimitiveH256};

pub type H160 = PrimitiveH160;
pub type H256 = PrimitiveH256;

pub trait HashExt {
    /// Copies up to 32 bytes from `slice`; shorter input is right-padded with zeros.
    fn from_slice_padded(slice: &[u8]) -> Self;
    
    fn to_alloy(&self) -> alloy_primitives::B256;
    
    fn from_alloy(hash: alloy_primitives::B256) -> Self;
}

impl HashExt for H256 {
    fn from_slice_padded(slice: &[u8]) -> Self {
        let mut hash = H256::zero();
        let len = std::cmp::min(slice.len(), 32);
        hash.as_bytes_mut()[..len].copy_from_slice(&slice[..len]);
        hash
    }
    
    fn to_alloy(&self) -> alloy_primitives::B256 {
        alloy_primitives::B256::from(self.to_fixed_bytes())
    }
    
    fn from_alloy(hash: alloy_primitives::B256) -> Self {
        H256::from(hash.0)
    }
}
