use super::{RecoveryConfig, RecoveryEngine, RecoveryError, PendingRecovery};
use crate::{
    auth::CallContext,
    host::Host,
    interfaces::{Contract, Module},
    Result,
};
use smartwallet_types::{Address, Bytes, H256};

fn single_guardian(config: &RecoveryConfig) -> std::result::Result<(), RecoveryError> {
    if config.guardians.len() != 1 || config.threshold != 1 {
        return Err(RecoveryError::InvalidThreshold);
    }
    config.validate()
}

const ENGINE: RecoveryEngine = RecoveryEngine {
    name: "CloudRecovery",
    check_config: single_guardian,
};

/// Recovery approved by a single cloud-held guardian key.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudRecoveryModule;

impl CloudRecoveryModule {
    pub fn config(host: &Host, module: &Address, account: &Address) -> Result<Option<RecoveryConfig>> {
        ENGINE.config(host, module, account)
    }
    
    pub fn pending(host: &Host, module: &Address, account: &Address) -> Result<Option<PendingRecovery>> {
        ENGINE.pending(host, module, account)
    }
    
    pub fn recovery_digest(host: &Host, module: &Address, account: &Address, new_owner: &[u8]) -> Result<H256> {
        ENGINE.digest(host, module, account, new_owner)
    }
}

impl Module for CloudRecoveryModule {
    fn init(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<()> {
        ENGINE.init(host, ctx, data)
    }
    
    fn disable(&self, host: &mut Host, ctx: &CallContext) -> Result<()> {
        ENGINE.disable(host, ctx)
    }
}

impl Contract for CloudRecoveryModule {
    fn as_module(&self) -> Option<&dyn Module> {
        Some(self)
    }
    
    fn call(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<Bytes> {
        ENGINE.dispatch(host, ctx, data)
    }
}
