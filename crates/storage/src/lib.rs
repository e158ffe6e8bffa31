use thiserror::Error;

pub mod journal;
pub mod memory;
pub mod traits;

pub use journal::*;
pub use memory::*;
pub use traits::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
    
    #[error("Invalid data: {0}")]
    InvalidData(String),
    
    #[error("Checkpoint {0} is no longer open")]
    StaleCheckpoint(usize),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Key-value pair type alias
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Key prefixes of the account state schema.
///
/// The byte values are part of the persisted layout and must never be
/// renumbered; new data gets a new prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    Balance = 0x00,
    Implementation = 0x01,
    Nonce = 0x02,
    SchemaVersion = 0x03,
    R1Owners = 0x10,
    K1Owners = 0x11,
    R1Validators = 0x12,
    K1Validators = 0x13,
    Modules = 0x14,
    ValidationHooks = 0x15,
    ExecutionHooks = 0x16,
    HookData = 0x20,
    ContractStorage = 0x30,
}

impl KeyPrefix {
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }
    
    pub fn make_key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + suffix.len());
        key.push(self.as_byte());
        key.extend_from_slice(suffix);
        key
    }
}

/// Helper functions for building schema keys
pub mod keys {
    use super::*;
    use smartwallet_types::{Address, H256};
    
    const SET_ENTRY: u8 = 0x00;
    const SET_INDEX: u8 = 0x01;
    const SET_NEXT: u8 = 0x02;
    const SET_LEN: u8 = 0x03;
    
    pub fn account_key(prefix: KeyPrefix, account: &Address) -> Vec<u8> {
        prefix.make_key(account.as_bytes())
    }
    
    pub fn balance_key(address: &Address) -> Vec<u8> {
        account_key(KeyPrefix::Balance, address)
    }
    
    pub fn hook_data_key(account: &Address, hook: &Address, key: &H256) -> Vec<u8> {
        let mut suffix = Vec::with_capacity(72);
        suffix.extend_from_slice(account.as_bytes());
        suffix.extend_from_slice(hook.as_bytes());
        suffix.extend_from_slice(key.as_bytes());
        KeyPrefix::HookData.make_key(&suffix)
    }
    
    pub fn contract_storage_key(contract: &Address, slot: &[u8]) -> Vec<u8> {
        let mut suffix = Vec::with_capacity(20 + slot.len());
        suffix.extend_from_slice(contract.as_bytes());
        suffix.extend_from_slice(slot);
        KeyPrefix::ContractStorage.make_key(&suffix)
    }
    
    fn set_key(prefix: KeyPrefix, account: &Address, tag: u8, tail: &[u8]) -> Vec<u8> {
        let mut key = account_key(prefix, account);
        key.push(tag);
        key.extend_from_slice(tail);
        key
    }
    
    /// Prefix under which the members of an ordered set are stored by sequence number.
    pub fn set_entries_prefix(prefix: KeyPrefix, account: &Address) -> Vec<u8> {
        set_key(prefix, account, SET_ENTRY, &[])
    }
    
    pub fn set_entry_key(prefix: KeyPrefix, account: &Address, seq: u64) -> Vec<u8> {
        set_key(prefix, account, SET_ENTRY, &seq.to_be_bytes())
    }
    
    pub fn set_index_key(prefix: KeyPrefix, account: &Address, member: &[u8]) -> Vec<u8> {
        set_key(prefix, account, SET_INDEX, member)
    }
    
    pub fn set_next_key(prefix: KeyPrefix, account: &Address) -> Vec<u8> {
        set_key(prefix, account, SET_NEXT, &[])
    }
    
    pub fn set_len_key(prefix: KeyPrefix, account: &Address) -> Vec<u8> {
        set_key(prefix, account, SET_LEN, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartwallet_types::Address;
    
    #[test]
    fn test_key_prefix() {
        let account = Address::from_low_u64_be(42);
        let key = keys::balance_key(&account);
        assert_eq!(key[0], KeyPrefix::Balance.as_byte());
        assert_eq!(&key[1..], account.as_bytes());
    }
    
    #[test]
    fn test_set_entries_sort_by_sequence() {
        let account = Address::from_low_u64_be(1);
        let prefix = keys::set_entries_prefix(KeyPrefix::Modules, &account);
        let first = keys::set_entry_key(KeyPrefix::Modules, &account, 1);
        let second = keys::set_entry_key(KeyPrefix::Modules, &account, 256);
        
        assert!(first.starts_with(&prefix));
        assert!(second.starts_with(&prefix));
        assert!(first < second);
        assert!(!keys::set_index_key(KeyPrefix::Modules, &account, &[0]).starts_with(&prefix));
    }
}
