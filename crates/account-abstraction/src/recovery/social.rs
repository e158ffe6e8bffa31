use super::{PendingRecovery, RecoveryConfig, RecoveryEngine};
use crate::{
    auth::CallContext,
    host::Host,
    interfaces::{Contract, Module},
    Result,
};
use smartwallet_types::{Address, Bytes, H256};

const ENGINE: RecoveryEngine = RecoveryEngine {
    name: "SocialRecovery",
    check_config: RecoveryConfig::validate,
};

/// Recovery approved by a threshold of EOA or smart-account guardians.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialRecoveryModule;

impl SocialRecoveryModule {
    pub fn config(host: &Host, module: &Address, account: &Address) -> Result<Option<RecoveryConfig>> {
        ENGINE.config(host, module, account)
    }
    
    pub fn pending(host: &Host, module: &Address, account: &Address) -> Result<Option<PendingRecovery>> {
        ENGINE.pending(host, module, account)
    }
    
    pub fn nonce(host: &Host, module: &Address, account: &Address) -> Result<u64> {
        ENGINE.nonce(host, module, account)
    }
    
    pub fn recovery_digest(host: &Host, module: &Address, account: &Address, new_owner: &[u8]) -> Result<H256> {
        ENGINE.digest(host, module, account, new_owner)
    }
}

impl Module for SocialRecoveryModule {
    fn init(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<()> {
        ENGINE.init(host, ctx, data)
    }
    
    fn disable(&self, host: &mut Host, ctx: &CallContext) -> Result<()> {
        ENGINE.disable(host, ctx)
    }
}

impl Contract for SocialRecoveryModule {
    fn as_module(&self) -> Option<&dyn Module> {
        Some(self)
    }
    
    fn call(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<Bytes> {
        ENGINE.dispatch(host, ctx, data)
    }
}
