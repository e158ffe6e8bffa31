//! Caller authorization. Every check re-reads registry state so a nested
//! call always sees the current membership.

use crate::{host::Host, layout, AccountError, Result};
use smartwallet_types::{Address, U256};

/// Identity of the executing contract and its immediate caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The contract whose code is running.
    pub address: Address,
    pub caller: Address,
    pub value: U256,
}

impl CallContext {
    pub fn new(address: Address, caller: Address, value: U256) -> Self {
        Self {
            address,
            caller,
            value,
        }
    }
    
    /// A call that carries no value.
    pub fn plain(address: Address, caller: Address) -> Self {
        Self::new(address, caller, U256::zero())
    }
    
    pub fn is_self_call(&self) -> bool {
        self.caller == self.address
    }
}

pub fn require_self(ctx: &CallContext) -> Result<()> {
    if ctx.is_self_call() {
        Ok(())
    } else {
        Err(AccountError::Unauthorized { caller: ctx.caller })
    }
}

pub fn require_self_or_module(host: &Host, ctx: &CallContext) -> Result<()> {
    if ctx.is_self_call() || layout::modules(ctx.address).contains(host, ctx.caller.as_bytes())? {
        Ok(())
    } else {
        Err(AccountError::Unauthorized { caller: ctx.caller })
    }
}

pub fn require_module(host: &Host, ctx: &CallContext) -> Result<()> {
    if layout::modules(ctx.address).contains(host, ctx.caller.as_bytes())? {
        Ok(())
    } else {
        Err(AccountError::NotFromModule { caller: ctx.caller })
    }
}

/// The caller must be an installed validation or execution hook.
pub fn require_hook(host: &Host, ctx: &CallContext) -> Result<()> {
    let caller = ctx.caller.as_bytes();
    if layout::hooks(ctx.address, true).contains(host, caller)?
        || layout::hooks(ctx.address, false).contains(host, caller)?
    {
        Ok(())
    } else {
        Err(AccountError::NotFromHook { caller: ctx.caller })
    }
}

pub fn require_bootloader(host: &Host, ctx: &CallContext) -> Result<()> {
    if ctx.caller == host.config().bootloader {
        Ok(())
    } else {
        Err(AccountError::NotFromBootloader { caller: ctx.caller })
    }
}
