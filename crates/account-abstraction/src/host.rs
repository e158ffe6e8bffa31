//! The world the accounts live in: journaled key-value state, deployed
//! contracts, balances, the event log and the per-transaction gas meter.

use crate::{
    account::SmartAccount, auth::CallContext, batch::BatchCaller, events::Event,
    interfaces::Contract, AccountError, Result,
};
use serde::{de::DeserializeOwned, Serialize};
use smartwallet_core::{Gas, GasCost};
use smartwallet_storage::{
    keys, Checkpoint, Database, JournaledDatabase, KeyValue, MemoryDatabase, TypedDatabase,
};
use smartwallet_types::{Address, Bytes, UintExt, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Deepest nesting of contract calls before a frame reverts.
pub const MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub chain_id: u64,
    /// System address allowed to drive validation and execution.
    pub bootloader: Address,
    /// Address whose calls are executed as batches in the account's context.
    pub batch_caller: Address,
    /// Upper bound on hooks of each kind per account.
    pub max_hooks: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            chain_id: 270,
            bootloader: Address::from_low_u64_be(0x8001),
            batch_caller: Address::from_low_u64_be(0x8100),
            max_hooks: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCheckpoint {
    state: Checkpoint,
    events: usize,
}

pub struct Host {
    config: HostConfig,
    state: JournaledDatabase<MemoryDatabase>,
    contracts: HashMap<Address, Arc<dyn Contract>>,
    implementations: HashMap<Address, u32>,
    accounts: HashSet<Address>,
    processing: HashSet<Address>,
    events: Vec<Event>,
    gas: Option<Gas>,
    timestamp: u64,
    depth: usize,
}

impl Host {
    pub fn new(config: HostConfig) -> Self {
        let batch_caller = config.batch_caller;
        let mut host = Self {
            config,
            state: JournaledDatabase::new(MemoryDatabase::new()),
            contracts: HashMap::new(),
            implementations: HashMap::new(),
            accounts: HashSet::new(),
            processing: HashSet::new(),
            events: Vec::new(),
            gas: None,
            timestamp: 0,
            depth: 0,
        };
        host.deploy_contract(batch_caller, Arc::new(BatchCaller));
        host
    }
    
    pub fn config(&self) -> &HostConfig {
        &self.config
    }
    
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }
    
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
    
    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }
    
    // Contracts
    
    pub fn deploy_contract(&mut self, address: Address, contract: Arc<dyn Contract>) {
        debug!(%address, "contract deployed");
        self.contracts.insert(address, contract);
    }
    
    pub fn contract(&self, address: &Address) -> Option<Arc<dyn Contract>> {
        self.contracts.get(address).cloned()
    }
    
    pub fn register_implementation(&mut self, address: Address, schema_version: u32) {
        debug!(%address, schema_version, "implementation registered");
        self.implementations.insert(address, schema_version);
    }
    
    pub fn implementation_schema(&self, address: &Address) -> Option<u32> {
        self.implementations.get(address).copied()
    }
    
    /// Deploy a smart account seeded with one R1 owner, one R1 validator and
    /// optional `module || initData` payloads. Nothing is deployed on failure.
    pub fn deploy_account(
        &mut self,
        address: Address,
        implementation: Address,
        r1_owner: &[u8],
        r1_validator: Address,
        modules: &[Bytes],
    ) -> Result<()> {
        if self.contracts.contains_key(&address) {
            return Err(AccountError::AlreadyInitialized(address));
        }
        self.contracts.insert(address, Arc::new(SmartAccount));
        self.accounts.insert(address);
        
        let checkpoint = self.checkpoint();
        let result =
            SmartAccount::initialize(self, address, implementation, r1_owner, r1_validator, modules);
        match result {
            Ok(()) => {
                self.commit(checkpoint)?;
                info!(%address, %implementation, "account deployed");
                Ok(())
            }
            Err(err) => {
                self.revert(checkpoint)?;
                self.contracts.remove(&address);
                self.accounts.remove(&address);
                Err(err)
            }
        }
    }
    
    pub fn is_account(&self, address: &Address) -> bool {
        self.accounts.contains(address)
    }
    
    // Balances
    
    pub fn balance(&self, address: &Address) -> Result<U256> {
        Ok(self
            .state
            .get(&keys::balance_key(address))?
            .map(|bytes| U256::from_big_endian(&bytes))
            .unwrap_or_default())
    }
    
    pub fn set_balance(&mut self, address: Address, balance: U256) -> Result<()> {
        self.state.put(&keys::balance_key(&address), &balance.to_be_word())?;
        Ok(())
    }
    
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<()> {
        if value.is_zero() || from == to {
            return self.ensure_balance(from, value);
        }
        self.ensure_balance(from, value)?;
        
        let from_balance = self.balance(&from)?;
        self.set_balance(from, from_balance - value)?;
        let to_balance = self.balance(&to)?;
        self.set_balance(to, to_balance.saturating_add(value))?;
        Ok(())
    }
    
    fn ensure_balance(&self, address: Address, required: U256) -> Result<()> {
        let balance = self.balance(&address)?;
        if balance < required {
            return Err(AccountError::InsufficientBalance {
                address,
                balance,
                required,
            });
        }
        Ok(())
    }
    
    // Calls
    
    /// Message call from `caller` to `target`. Value moves first; a target
    /// without code accepts any call. All effects revert if the callee fails.
    pub fn call(&mut self, caller: Address, target: Address, value: U256, data: &[u8]) -> Result<Bytes> {
        self.frame(|host| {
            if !value.is_zero() {
                host.charge(GasCost::CALLVALUE)?;
            }
            host.transfer(caller, target, value)?;
            match host.contract(&target) {
                Some(contract) => {
                    let ctx = CallContext::new(target, caller, value);
                    contract.call(host, &ctx, data)
                }
                None => Ok(Bytes::new()),
            }
        })
    }
    
    /// Runs `f` as a nested call frame: charged as a call, bounded in depth,
    /// and rolled back entirely if it fails.
    pub fn frame<R>(&mut self, f: impl FnOnce(&mut Host) -> Result<R>) -> Result<R> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(AccountError::Reverted(format!(
                "call depth {} exceeded",
                MAX_CALL_DEPTH
            )));
        }
        self.charge(GasCost::CALL)?;
        
        let checkpoint = self.checkpoint();
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        
        match result {
            Ok(value) => {
                self.commit(checkpoint)?;
                Ok(value)
            }
            Err(err) => {
                trace!(error = %err, depth = self.depth, "frame reverted");
                self.revert(checkpoint)?;
                Err(err)
            }
        }
    }
    
    pub fn checkpoint(&mut self) -> HostCheckpoint {
        HostCheckpoint {
            state: self.state.checkpoint(),
            events: self.events.len(),
        }
    }
    
    pub fn commit(&mut self, checkpoint: HostCheckpoint) -> Result<()> {
        self.state.commit(checkpoint.state)?;
        Ok(())
    }
    
    pub fn revert(&mut self, checkpoint: HostCheckpoint) -> Result<()> {
        self.state.revert_to(checkpoint.state)?;
        self.events.truncate(checkpoint.events);
        Ok(())
    }
    
    // Gas
    
    /// Start a meter of `limit`, returning the meter it shadows. Hand that
    /// back to [`Host::end_metering`] to resume it.
    pub fn begin_metering(&mut self, limit: u64) -> Option<Gas> {
        self.gas.replace(Gas::new(limit))
    }
    
    /// Stop the active meter and reinstate `outer`.
    pub fn end_metering(&mut self, outer: Option<Gas>) -> Option<Gas> {
        std::mem::replace(&mut self.gas, outer)
    }
    
    /// Consume gas from the active meter; free when nothing is metered.
    pub fn charge(&mut self, amount: u64) -> Result<()> {
        if let Some(gas) = self.gas.as_mut() {
            gas.consume(amount)?;
        }
        Ok(())
    }
    
    // Events
    
    pub fn emit(&mut self, event: Event) -> Result<()> {
        self.charge(GasCost::LOG)?;
        debug!(?event, "event");
        self.events.push(event);
        Ok(())
    }
    
    pub fn events(&self) -> &[Event] {
        &self.events
    }
    
    // Raw state
    
    pub(crate) fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(key)?)
    }
    
    pub(crate) fn write(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.charge(GasCost::SSTORE)?;
        self.state.put(key, value)?;
        Ok(())
    }
    
    pub(crate) fn erase(&mut self, key: &[u8]) -> Result<()> {
        self.charge(GasCost::SRESET)?;
        self.state.delete(key)?;
        Ok(())
    }
    
    pub(crate) fn scan(&self, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        Ok(self.state.iter_prefix(prefix)?)
    }
    
    /// Current key-value state, including writes of still-open checkpoints.
    /// Used to compare snapshots.
    pub fn state(&self) -> &MemoryDatabase {
        self.state.inner()
    }
    
    // Contract storage
    
    pub fn load<T: DeserializeOwned>(&self, contract: &Address, slot: &[u8]) -> Result<Option<T>> {
        Ok(self.state.get_typed(&keys::contract_storage_key(contract, slot))?)
    }
    
    pub fn store<T: Serialize>(&mut self, contract: &Address, slot: &[u8], value: &T) -> Result<()> {
        self.charge(GasCost::SSTORE)?;
        self.state
            .put_typed(&keys::contract_storage_key(contract, slot), value)?;
        Ok(())
    }
    
    pub fn clear(&mut self, contract: &Address, slot: &[u8]) -> Result<()> {
        self.erase(&keys::contract_storage_key(contract, slot))
    }
    
    // Transaction guard
    
    pub(crate) fn enter(&mut self, account: Address) -> Result<()> {
        if !self.processing.insert(account) {
            return Err(AccountError::Reentrancy(account));
        }
        Ok(())
    }
    
    pub(crate) fn exit(&mut self, account: &Address) {
        self.processing.remove(account);
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }
    
    #[test]
    fn test_transfer() {
        let mut host = Host::default();
        host.set_balance(addr(1), U256::from(100u64)).unwrap();
        
        host.transfer(addr(1), addr(2), U256::from(40u64)).unwrap();
        assert_eq!(host.balance(&addr(1)).unwrap(), U256::from(60u64));
        assert_eq!(host.balance(&addr(2)).unwrap(), U256::from(40u64));
        
        let err = host.transfer(addr(1), addr(2), U256::from(61u64)).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientBalance { .. }));
    }
    
    #[test]
    fn test_failed_frame_reverts_state_and_events() {
        let mut host = Host::default();
        host.set_balance(addr(1), U256::from(10u64)).unwrap();
        
        let result: Result<()> = host.frame(|host| {
            host.transfer(addr(1), addr(2), U256::from(10u64))?;
            host.emit(Event::ModuleAdded {
                account: addr(1),
                module: addr(2),
            })?;
            Err(AccountError::Reverted("boom".into()))
        });
        
        assert!(result.is_err());
        assert_eq!(host.balance(&addr(1)).unwrap(), U256::from(10u64));
        assert!(host.events().is_empty());
    }
    
    #[test]
    fn test_call_to_codeless_address_moves_value() {
        let mut host = Host::default();
        host.set_balance(addr(1), U256::from(5u64)).unwrap();
        
        host.call(addr(1), addr(9), U256::from(5u64), &[0xab]).unwrap();
        assert_eq!(host.balance(&addr(9)).unwrap(), U256::from(5u64));
    }
    
    #[test]
    fn test_metering() {
        let mut host = Host::default();
        assert!(host.begin_metering(GasCost::CALL + 1).is_none());
        host.charge(GasCost::CALL).unwrap();
        assert!(matches!(host.charge(2), Err(AccountError::OutOfGas { .. })));
        assert_eq!(host.end_metering(None).map(|gas| gas.used()), Some(GasCost::CALL));
        host.charge(u64::MAX).unwrap();
    }
    
    #[test]
    fn test_nested_meter_resumes_outer() {
        let mut host = Host::default();
        host.begin_metering(100);
        host.charge(40).unwrap();
        
        let outer = host.begin_metering(1_000);
        host.charge(500).unwrap();
        assert_eq!(host.end_metering(outer).map(|gas| gas.used()), Some(500));
        
        host.charge(60).unwrap();
        assert!(matches!(host.charge(1), Err(AccountError::OutOfGas { limit: 100, .. })));
        assert_eq!(host.end_metering(None).map(|gas| gas.used()), Some(100));
    }
    
    #[test]
    fn test_contract_storage() {
        let mut host = Host::default();
        host.store(&addr(7), b"slot", &(3u64, vec![1u8, 2])).unwrap();
        let value: Option<(u64, Vec<u8>)> = host.load(&addr(7), b"slot").unwrap();
        assert_eq!(value, Some((3, vec![1, 2])));
        
        host.clear(&addr(7), b"slot").unwrap();
        assert_eq!(host.load::<(u64, Vec<u8>)>(&addr(7), b"slot").unwrap(), None);
    }
}
