//! Account state layout on top of the host key-value store.
//!
//! Registries are insertion-ordered sets: members are stored under a
//! monotonically increasing sequence number, so removing one member never
//! reorders the rest.

use crate::{host::Host, AccountError, Keyspace, Result};
use smartwallet_storage::{keys, KeyPrefix, StorageError};
use smartwallet_types::{Address, Bytes, H256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedSet {
    prefix: KeyPrefix,
    account: Address,
}

impl OrderedSet {
    pub fn new(prefix: KeyPrefix, account: Address) -> Self {
        Self { prefix, account }
    }
    
    pub fn contains(&self, host: &Host, member: &[u8]) -> Result<bool> {
        Ok(host.read(&keys::set_index_key(self.prefix, &self.account, member))?.is_some())
    }
    
    pub fn len(&self, host: &Host) -> Result<u64> {
        read_u64(host, &keys::set_len_key(self.prefix, &self.account))
    }
    
    pub fn is_empty(&self, host: &Host) -> Result<bool> {
        Ok(self.len(host)? == 0)
    }
    
    /// Appends `member`. Returns false if it was already present.
    pub fn insert(&self, host: &mut Host, member: &[u8]) -> Result<bool> {
        if self.contains(host, member)? {
            return Ok(false);
        }
        
        let next_key = keys::set_next_key(self.prefix, &self.account);
        let seq = read_u64(host, &next_key)?;
        host.write(&keys::set_entry_key(self.prefix, &self.account, seq), member)?;
        host.write(
            &keys::set_index_key(self.prefix, &self.account, member),
            &seq.to_be_bytes(),
        )?;
        host.write(&next_key, &(seq + 1).to_be_bytes())?;
        
        let len = self.len(host)?;
        host.write(&keys::set_len_key(self.prefix, &self.account), &(len + 1).to_be_bytes())?;
        Ok(true)
    }
    
    /// Returns false if `member` was not present.
    pub fn remove(&self, host: &mut Host, member: &[u8]) -> Result<bool> {
        let index_key = keys::set_index_key(self.prefix, &self.account, member);
        let seq = match host.read(&index_key)? {
            Some(bytes) => decode_u64(&bytes)?,
            None => return Ok(false),
        };
        
        host.erase(&keys::set_entry_key(self.prefix, &self.account, seq))?;
        host.erase(&index_key)?;
        
        let len = self.len(host)?;
        host.write(
            &keys::set_len_key(self.prefix, &self.account),
            &len.saturating_sub(1).to_be_bytes(),
        )?;
        Ok(true)
    }
    
    /// Members in insertion order.
    pub fn members(&self, host: &Host) -> Result<Vec<Vec<u8>>> {
        Ok(host
            .scan(&keys::set_entries_prefix(self.prefix, &self.account))?
            .into_iter()
            .map(|(_, member)| member)
            .collect())
    }
    
    pub fn addresses(&self, host: &Host) -> Result<Vec<Address>> {
        self.members(host)?
            .iter()
            .map(|member| {
                Address::from_slice(member)
                    .map_err(|e| AccountError::from(StorageError::InvalidData(e.to_string())))
            })
            .collect()
    }
    
    pub fn clear(&self, host: &mut Host) -> Result<()> {
        for member in self.members(host)? {
            self.remove(host, &member)?;
        }
        Ok(())
    }
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let word: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::InvalidData(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(word))
}

fn read_u64(host: &Host, key: &[u8]) -> Result<u64> {
    match host.read(key)? {
        Some(bytes) => decode_u64(&bytes),
        None => Ok(0),
    }
}

pub fn owners(account: Address, keyspace: Keyspace) -> OrderedSet {
    match keyspace {
        Keyspace::R1 => OrderedSet::new(KeyPrefix::R1Owners, account),
        Keyspace::K1 => OrderedSet::new(KeyPrefix::K1Owners, account),
    }
}

pub fn validators(account: Address, keyspace: Keyspace) -> OrderedSet {
    match keyspace {
        Keyspace::R1 => OrderedSet::new(KeyPrefix::R1Validators, account),
        Keyspace::K1 => OrderedSet::new(KeyPrefix::K1Validators, account),
    }
}

pub fn modules(account: Address) -> OrderedSet {
    OrderedSet::new(KeyPrefix::Modules, account)
}

pub fn hooks(account: Address, is_validation: bool) -> OrderedSet {
    if is_validation {
        OrderedSet::new(KeyPrefix::ValidationHooks, account)
    } else {
        OrderedSet::new(KeyPrefix::ExecutionHooks, account)
    }
}

pub fn nonce(host: &Host, account: &Address) -> Result<u64> {
    read_u64(host, &keys::account_key(KeyPrefix::Nonce, account))
}

pub(crate) fn set_nonce(host: &mut Host, account: &Address, nonce: u64) -> Result<()> {
    host.write(&keys::account_key(KeyPrefix::Nonce, account), &nonce.to_be_bytes())
}

pub fn implementation(host: &Host, account: &Address) -> Result<Option<Address>> {
    match host.read(&keys::account_key(KeyPrefix::Implementation, account))? {
        Some(bytes) => Ok(Some(
            Address::from_slice(&bytes).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        )),
        None => Ok(None),
    }
}

pub(crate) fn set_implementation(host: &mut Host, account: &Address, implementation: &Address) -> Result<()> {
    host.write(
        &keys::account_key(KeyPrefix::Implementation, account),
        implementation.as_bytes(),
    )
}

pub fn schema_version(host: &Host, account: &Address) -> Result<u32> {
    match host.read(&keys::account_key(KeyPrefix::SchemaVersion, account))? {
        Some(bytes) => {
            let word: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                StorageError::InvalidData(format!("expected 4 bytes, got {}", bytes.len()))
            })?;
            Ok(u32::from_be_bytes(word))
        }
        None => Ok(0),
    }
}

pub(crate) fn set_schema_version(host: &mut Host, account: &Address, version: u32) -> Result<()> {
    host.write(
        &keys::account_key(KeyPrefix::SchemaVersion, account),
        &version.to_be_bytes(),
    )
}

pub fn hook_data(host: &Host, account: &Address, hook: &Address, key: &H256) -> Result<Bytes> {
    Ok(host
        .read(&keys::hook_data_key(account, hook, key))?
        .map(Bytes::from_vec)
        .unwrap_or_default())
}

/// Empty `value` deletes the entry.
pub(crate) fn set_hook_data(
    host: &mut Host,
    account: &Address,
    hook: &Address,
    key: &H256,
    value: &[u8],
) -> Result<()> {
    let storage_key = keys::hook_data_key(account, hook, key);
    if value.is_empty() {
        host.erase(&storage_key)
    } else {
        host.write(&storage_key, value)
    }
}
