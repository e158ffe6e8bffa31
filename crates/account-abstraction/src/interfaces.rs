//! Capability traits of the contracts an account plugs in, and the
//! interface probe registries use before accepting one.

use crate::{auth::CallContext, host::Host, AccountError, Result};
use smartwallet_core::Transaction;
use smartwallet_crypto::{selector, R1PublicKey};
use smartwallet_types::{Address, Bytes, H256, U256};

/// ERC-165 style identifier: XOR of the selectors of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub [u8; 4]);

impl InterfaceId {
    pub fn from_signatures(signatures: &[&str]) -> Self {
        let mut id = [0u8; 4];
        for signature in signatures {
            for (byte, sel) in id.iter_mut().zip(selector(signature)) {
                *byte ^= sel;
            }
        }
        InterfaceId(id)
    }
    
    pub fn r1_validator() -> Self {
        Self::from_signatures(&["validateSignature(bytes32,bytes,bytes32[2])"])
    }
    
    pub fn k1_validator() -> Self {
        Self::from_signatures(&["validateSignature(bytes32,bytes)"])
    }
    
    pub fn module() -> Self {
        Self::from_signatures(&["init(bytes)", "disable()"])
    }
    
    pub fn validation_hook() -> Self {
        Self::from_signatures(&[
            "onInstall(bytes)",
            "onUninstall(bytes)",
            "validationHook(bytes32,bytes,bytes)",
        ])
    }
    
    pub fn execution_hook() -> Self {
        Self::from_signatures(&[
            "onInstall(bytes)",
            "onUninstall(bytes)",
            "preExecutionHook(bytes)",
            "postExecutionHook(bytes)",
        ])
    }
    
    pub fn paymaster() -> Self {
        Self::from_signatures(&["validateAndPayForPaymasterTransaction(bytes32,bytes32,bytes)"])
    }
}

/// A deployed contract. Capabilities are exposed through the `as_*`
/// accessors; `supports_interface` is the probe registries check first.
pub trait Contract: Send + Sync {
    fn supports_interface(&self, id: InterfaceId) -> bool {
        (id == InterfaceId::r1_validator() && self.as_r1_validator().is_some())
            || (id == InterfaceId::k1_validator() && self.as_k1_validator().is_some())
            || (id == InterfaceId::module() && self.as_module().is_some())
            || (id == InterfaceId::validation_hook() && self.as_validation_hook().is_some())
            || (id == InterfaceId::execution_hook() && self.as_execution_hook().is_some())
            || (id == InterfaceId::paymaster() && self.as_paymaster().is_some())
    }
    
    fn as_r1_validator(&self) -> Option<&dyn R1Validator> {
        None
    }
    
    fn as_k1_validator(&self) -> Option<&dyn K1Validator> {
        None
    }
    
    fn as_module(&self) -> Option<&dyn Module> {
        None
    }
    
    fn as_validation_hook(&self) -> Option<&dyn ValidationHook> {
        None
    }
    
    fn as_execution_hook(&self) -> Option<&dyn ExecutionHook> {
        None
    }
    
    fn as_paymaster(&self) -> Option<&dyn Paymaster> {
        None
    }
    
    /// Message call with ABI `data`. Plain value transfers succeed; anything
    /// else reverts unless the contract overrides this.
    fn call(&self, _host: &mut Host, _ctx: &CallContext, data: &[u8]) -> Result<Bytes> {
        if data.is_empty() {
            Ok(Bytes::new())
        } else {
            Err(AccountError::Reverted("unknown selector".into()))
        }
    }
}

/// Stateless check of an R1 signature against one owner key.
pub trait R1Validator: Send + Sync {
    fn validate_signature(&self, signed_hash: &H256, signature: &[u8], public_key: &R1PublicKey) -> bool;
}

/// Stateless K1 signer recovery; the zero address means failure.
pub trait K1Validator: Send + Sync {
    fn validate_signature(&self, signed_hash: &H256, signature: &[u8]) -> Address;
}

/// Modules run with `ctx.address` = module and `ctx.caller` = account.
pub trait Module: Send + Sync {
    fn init(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<()>;
    
    fn disable(&self, host: &mut Host, ctx: &CallContext) -> Result<()>;
}

pub trait ValidationHook: Send + Sync {
    fn on_install(&self, _host: &mut Host, _ctx: &CallContext, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    
    fn on_remove(&self, _host: &mut Host, _ctx: &CallContext, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    
    /// Returns false to reject the transaction.
    fn validation_hook(
        &self,
        host: &mut Host,
        ctx: &CallContext,
        signed_hash: &H256,
        tx: &Transaction,
        hook_data: &[u8],
    ) -> Result<bool>;
}

pub trait ExecutionHook: Send + Sync {
    fn on_install(&self, _host: &mut Host, _ctx: &CallContext, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    
    fn on_remove(&self, _host: &mut Host, _ctx: &CallContext, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    
    /// Runs before execution; a non-empty return value is handed back to
    /// `post_execution`.
    fn pre_execution(&self, host: &mut Host, ctx: &CallContext, tx: &Transaction) -> Result<Bytes>;
    
    fn post_execution(&self, host: &mut Host, ctx: &CallContext, context: &[u8]) -> Result<()>;
}

/// Fee sponsor. Runs with `ctx.caller` = bootloader and must pay `fee` to it.
pub trait Paymaster: Send + Sync {
    fn validate_and_pay(
        &self,
        host: &mut Host,
        ctx: &CallContext,
        tx_hash: &H256,
        tx: &Transaction,
        fee: U256,
    ) -> Result<()>;
}

/// The capability of `contract`, if it passes the probe for `id`.
pub(crate) fn probe<'a, T: ?Sized>(
    contract: &'a dyn Contract,
    id: InterfaceId,
    capability: impl FnOnce(&'a dyn Contract) -> Option<&'a T>,
) -> Option<&'a T> {
    if contract.supports_interface(id) {
        capability(contract)
    } else {
        None
    }
}
