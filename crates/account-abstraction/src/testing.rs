//! Account fixture and contract doubles for tests.

use crate::{
    auth::CallContext,
    bootloader::{Bootloader, Receipt, TransactionFailure},
    host::{Host, HostConfig},
    interfaces::{Contract, ExecutionHook, Module, ValidationHook},
    managers::{HookManager, ModuleManager, OwnerManager, ValidatorManager},
    validators::{EoaValidator, TeeValidator},
    AccountError, Keyspace, Result,
};
use alloy_sol_types::{SolCall, SolValue};
use secp256k1::SecretKey;
use smartwallet_core::{abi::IAccount, SignatureEnvelope, Transaction};
use smartwallet_crypto::{sign_hash, R1SigningKey};
use smartwallet_types::{Address, Bytes, HashExt, UintExt, H256, U256};
use std::sync::Arc;

pub fn r1_validator_address() -> Address {
    Address::from_low_u64_be(0x1001)
}

pub fn k1_validator_address() -> Address {
    Address::from_low_u64_be(0x1002)
}

pub fn implementation_v1() -> Address {
    Address::from_low_u64_be(0x2001)
}

pub fn implementation_v2() -> Address {
    Address::from_low_u64_be(0x2002)
}

pub fn account_address() -> Address {
    Address::from_low_u64_be(0xa11ce)
}

/// One ether.
pub fn initial_balance() -> U256 {
    U256::exp10(18)
}

/// ABI-encoded bool, the hook data [`BoolHook`] expects.
pub fn bool_hook_data(value: bool) -> Bytes {
    Bytes::from_vec(value.abi_encode())
}

/// A funded account with one R1 owner and the TEE validator, plus the
/// system validators and two compatible implementations.
pub struct Fixture {
    pub host: Host,
    pub account: Address,
    pub r1_key: R1SigningKey,
    pub r1_validator: Address,
    pub k1_validator: Address,
    next_contract: u64,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(HostConfig::default())
    }
    
    pub fn with_max_hooks(max_hooks: usize) -> Self {
        Self::with_config(HostConfig {
            max_hooks,
            ..HostConfig::default()
        })
    }
    
    pub fn with_config(config: HostConfig) -> Self {
        let mut host = Host::new(config);
        host.deploy_contract(r1_validator_address(), Arc::new(TeeValidator));
        host.deploy_contract(k1_validator_address(), Arc::new(EoaValidator));
        host.register_implementation(implementation_v1(), 1);
        host.register_implementation(implementation_v2(), 1);
        
        let r1_key = R1SigningKey::random();
        let account = account_address();
        host.deploy_account(
            account,
            implementation_v1(),
            r1_key.public_key().as_bytes(),
            r1_validator_address(),
            &[],
        )
        .expect("fixture account deploys");
        host.set_balance(account, initial_balance())
            .expect("fixture balance");
        
        Self {
            host,
            account,
            r1_key,
            r1_validator: r1_validator_address(),
            k1_validator: k1_validator_address(),
            next_contract: 0x5000,
        }
    }
    
    pub fn self_ctx(&self) -> CallContext {
        CallContext::plain(self.account, self.account)
    }
    
    /// Deploy `contract` at a fresh address.
    pub fn deploy<C: Contract + 'static>(&mut self, contract: C) -> Address {
        let address = Address::from_low_u64_be(self.next_contract);
        self.next_contract += 1;
        self.host.deploy_contract(address, Arc::new(contract));
        address
    }
    
    pub fn deploy_passthrough_module(&mut self) -> Address {
        self.deploy(PassthroughModule)
    }
    
    pub fn install_module(&mut self, module: Address, init_data: &[u8]) -> Result<()> {
        let ctx = self.self_ctx();
        let mut payload = module.as_bytes().to_vec();
        payload.extend_from_slice(init_data);
        ModuleManager::add_module(&mut self.host, &ctx, &payload)
    }
    
    pub fn install_hook(&mut self, hook: Address, is_validation: bool) -> Result<()> {
        let ctx = self.self_ctx();
        HookManager::add_hook(&mut self.host, &ctx, hook.as_bytes(), is_validation)
    }
    
    pub fn add_k1_owner(&mut self, owner: Address) {
        let ctx = self.self_ctx();
        OwnerManager::add_owner(&mut self.host, &ctx, Keyspace::K1, owner.as_bytes())
            .expect("k1 owner added");
    }
    
    pub fn enable_k1_validator(&mut self) {
        let ctx = self.self_ctx();
        ValidatorManager::add_validator(&mut self.host, &ctx, Keyspace::K1, self.k1_validator)
            .expect("k1 validator added");
    }
    
    pub fn nonce(&self) -> u64 {
        crate::layout::nonce(&self.host, &self.account).expect("nonce readable")
    }
    
    pub fn transfer_tx(&self, to: Address, value: U256) -> Transaction {
        Transaction::new(self.account, to, value, Bytes::new(), self.nonce())
    }
    
    /// Transaction calling the account itself with `data`.
    pub fn self_call_tx(&self, data: Vec<u8>) -> Transaction {
        Transaction::new(self.account, self.account, U256::zero(), Bytes::from_vec(data), self.nonce())
    }
    
    /// Sign with the fixture's R1 key through the TEE validator.
    pub fn sign(&self, tx: Transaction, hook_data: Vec<Bytes>) -> Transaction {
        self.sign_with(tx, &self.r1_key, hook_data)
    }
    
    pub fn sign_with(&self, tx: Transaction, key: &R1SigningKey, hook_data: Vec<Bytes>) -> Transaction {
        let hash = tx.signing_hash(self.host.chain_id());
        let signature = key.sign_hash(&hash).expect("r1 signing");
        let envelope = SignatureEnvelope::new(signature.to_vec(), self.r1_validator, hook_data);
        tx.with_signature(envelope.encode())
    }
    
    pub fn sign_k1(&self, tx: Transaction, secret: &SecretKey, hook_data: Vec<Bytes>) -> Transaction {
        let hash = tx.signing_hash(self.host.chain_id());
        let signature = sign_hash(&hash, secret).expect("k1 signing");
        let envelope = SignatureEnvelope::new(signature.to_bytes().to_vec(), self.k1_validator, hook_data);
        tx.with_signature(envelope.encode())
    }
    
    pub fn send(&mut self, tx: &Transaction) -> std::result::Result<Receipt, TransactionFailure> {
        Bootloader::process_transaction(&mut self.host, tx)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

fn read_counter(host: &Host, contract: &Address, slot: &[u8]) -> Result<u64> {
    Ok(host.load::<u64>(contract, slot)?.unwrap_or(0))
}

fn bump_counter(host: &mut Host, contract: &Address, slot: &[u8]) -> Result<()> {
    let count = read_counter(host, contract, slot)?;
    host.store(contract, slot, &(count + 1))
}

fn slot(account: &Address, tag: &[u8]) -> Vec<u8> {
    let mut slot = account.as_bytes().to_vec();
    slot.extend_from_slice(tag);
    slot
}

/// Validation hook that passes iff its hook data is `abi.encode(false)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolHook;

impl ValidationHook for BoolHook {
    fn validation_hook(
        &self,
        _host: &mut Host,
        _ctx: &CallContext,
        _signed_hash: &H256,
        _tx: &Transaction,
        hook_data: &[u8],
    ) -> Result<bool> {
        let reject = bool::abi_decode(hook_data, true)?;
        Ok(!reject)
    }
}

impl Contract for BoolHook {
    fn as_validation_hook(&self) -> Option<&dyn ValidationHook> {
        Some(self)
    }
}

/// Validation hook that writes its hook data into the account's hook data
/// store under [`HookDataWriter::KEY`], then passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookDataWriter;

impl HookDataWriter {
    pub const KEY: H256 = H256::repeat_byte(0x11);
}

impl ValidationHook for HookDataWriter {
    fn validation_hook(
        &self,
        host: &mut Host,
        ctx: &CallContext,
        _signed_hash: &H256,
        _tx: &Transaction,
        hook_data: &[u8],
    ) -> Result<bool> {
        let call = IAccount::setHookDataCall {
            key: Self::KEY.to_alloy(),
            data: hook_data.to_vec().into(),
        };
        host.call(ctx.address, ctx.caller, U256::zero(), &call.abi_encode())?;
        Ok(true)
    }
}

impl Contract for HookDataWriter {
    fn as_validation_hook(&self) -> Option<&dyn ValidationHook> {
        Some(self)
    }
}

/// Execution hook counting its pre and post calls per account.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingHook;

impl RecordingHook {
    pub fn counts(host: &Host, hook: &Address, account: &Address) -> Result<(u64, u64)> {
        Ok((
            read_counter(host, hook, &slot(account, b"pre"))?,
            read_counter(host, hook, &slot(account, b"post"))?,
        ))
    }
}

impl ExecutionHook for RecordingHook {
    fn pre_execution(&self, host: &mut Host, ctx: &CallContext, tx: &Transaction) -> Result<Bytes> {
        bump_counter(host, &ctx.address, &slot(&ctx.caller, b"pre"))?;
        Ok(Bytes::from_vec(tx.nonce.to_be_bytes().to_vec()))
    }
    
    fn post_execution(&self, host: &mut Host, ctx: &CallContext, context: &[u8]) -> Result<()> {
        if context.len() != 8 {
            return Err(AccountError::Reverted("unexpected hook context".into()));
        }
        bump_counter(host, &ctx.address, &slot(&ctx.caller, b"post"))
    }
}

impl Contract for RecordingHook {
    fn as_execution_hook(&self) -> Option<&dyn ExecutionHook> {
        Some(self)
    }
}

/// Hook whose every callback except installation reverts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevertingHook;

impl ValidationHook for RevertingHook {
    fn on_remove(&self, _host: &mut Host, _ctx: &CallContext, _data: &[u8]) -> Result<()> {
        Err(AccountError::Reverted("hook refuses removal".into()))
    }
    
    fn validation_hook(
        &self,
        _host: &mut Host,
        _ctx: &CallContext,
        _signed_hash: &H256,
        _tx: &Transaction,
        _hook_data: &[u8],
    ) -> Result<bool> {
        Err(AccountError::Reverted("validation hook reverted".into()))
    }
}

impl ExecutionHook for RevertingHook {
    fn on_remove(&self, _host: &mut Host, _ctx: &CallContext, _data: &[u8]) -> Result<()> {
        Err(AccountError::Reverted("hook refuses removal".into()))
    }
    
    fn pre_execution(&self, _host: &mut Host, _ctx: &CallContext, _tx: &Transaction) -> Result<Bytes> {
        Err(AccountError::Reverted("pre-execution hook reverted".into()))
    }
    
    fn post_execution(&self, _host: &mut Host, _ctx: &CallContext, _context: &[u8]) -> Result<()> {
        Err(AccountError::Reverted("post-execution hook reverted".into()))
    }
}

impl Contract for RevertingHook {
    fn as_validation_hook(&self) -> Option<&dyn ValidationHook> {
        Some(self)
    }
    
    fn as_execution_hook(&self) -> Option<&dyn ExecutionHook> {
        Some(self)
    }
}

/// Module that remembers its init payload per account and forgets it on
/// disable. An init payload equal to [`PassthroughModule::REJECT`] fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughModule;

impl PassthroughModule {
    pub const REJECT: &'static [u8] = b"reject";
    
    pub fn init_data(host: &Host, module: &Address, account: &Address) -> Result<Option<Vec<u8>>> {
        host.load(module, &slot(account, b"init"))
    }
}

impl Module for PassthroughModule {
    fn init(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<()> {
        if data == Self::REJECT {
            return Err(AccountError::Reverted("module init rejected".into()));
        }
        host.store(&ctx.address, &slot(&ctx.caller, b"init"), &data.to_vec())
    }
    
    fn disable(&self, host: &mut Host, ctx: &CallContext) -> Result<()> {
        host.clear(&ctx.address, &slot(&ctx.caller, b"init"))
    }
}

impl Contract for PassthroughModule {
    fn as_module(&self) -> Option<&dyn Module> {
        Some(self)
    }
}

/// Validation hook that calls back into the account to add its hook data
/// as an R1 owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerGrabHook;

impl ValidationHook for OwnerGrabHook {
    fn validation_hook(
        &self,
        host: &mut Host,
        ctx: &CallContext,
        _signed_hash: &H256,
        _tx: &Transaction,
        hook_data: &[u8],
    ) -> Result<bool> {
        let call = IAccount::r1AddOwnerCall {
            pubKey: hook_data.to_vec().into(),
        };
        host.call(ctx.address, ctx.caller, U256::zero(), &call.abi_encode())?;
        Ok(true)
    }
}

impl Contract for OwnerGrabHook {
    fn as_validation_hook(&self) -> Option<&dyn ValidationHook> {
        Some(self)
    }
}

/// Module that calls back into the account from `disable`. With
/// [`ReentrantModule::DRAIN`] it sends one wei to [`ReentrantModule::sink`]
/// through `executeFromModule`; with [`ReentrantModule::REINSTALL`] it tries
/// to add itself again.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReentrantModule;

impl ReentrantModule {
    pub const DRAIN: &'static [u8] = b"drain";
    pub const REINSTALL: &'static [u8] = b"reinstall";
    
    pub fn sink() -> Address {
        Address::from_low_u64_be(0x5111)
    }
}

impl Module for ReentrantModule {
    fn init(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<()> {
        host.store(&ctx.address, &slot(&ctx.caller, b"mode"), &data.to_vec())
    }
    
    fn disable(&self, host: &mut Host, ctx: &CallContext) -> Result<()> {
        let mode: Vec<u8> = host.load(&ctx.address, &slot(&ctx.caller, b"mode"))?.unwrap_or_default();
        let call = if mode == Self::DRAIN {
            IAccount::executeFromModuleCall {
                to: Self::sink().into(),
                value: U256::one().to_alloy(),
                data: Default::default(),
            }
            .abi_encode()
        } else {
            let mut payload = ctx.address.as_bytes().to_vec();
            payload.extend_from_slice(&mode);
            IAccount::addModuleCall {
                moduleAndData: payload.into(),
            }
            .abi_encode()
        };
        host.call(ctx.address, ctx.caller, U256::zero(), &call)?;
        host.clear(&ctx.address, &slot(&ctx.caller, b"mode"))
    }
}

impl Contract for ReentrantModule {
    fn as_module(&self) -> Option<&dyn Module> {
        Some(self)
    }
}
