use primitive_types::U256 as PrimitiveU256;

pub type U256 = PrimitiveU256;

pub trait UintExt: Sized {
    fn to_be_word(&self) -> [u8; 32];
    fn to_alloy(&self) -> alloy_primitives::U256;
    fn from_alloy(value: alloy_primitives::U256) -> Self;
}

impl UintExt for U256 {
    fn to_be_word(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes
    }
    
    fn to_alloy(&self) -> alloy_primitives::U256 {
        alloy_primitives::U256::from_be_bytes(self.to_be_word())
    }
    
    fn from_alloy(value: alloy_primitives::U256) -> Self {
        U256::from_big_endian(&value.to_be_bytes::<32>())
    }
}
