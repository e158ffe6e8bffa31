use crate::{
    auth::{require_hook, require_self_or_module, CallContext},
    events::Event,
    host::Host,
    interfaces::{probe, InterfaceId},
    layout,
    managers::module::split_address,
    AccountError, Result,
};
use smartwallet_core::Transaction;
use smartwallet_crypto::keccak256;
use smartwallet_types::{Address, Bytes, H256};
use tracing::{debug, info, warn};

/// Reserved hook-data key holding execution hook contexts. Hooks cannot write it.
pub fn context_key() -> H256 {
    keccak256(b"HookManager.context")
}

pub struct HookManager;

impl HookManager {
    /// `hook_and_data` is the hook address followed by its install payload.
    pub fn add_hook(host: &mut Host, ctx: &CallContext, hook_and_data: &[u8], is_validation: bool) -> Result<()> {
        require_self_or_module(host, ctx)?;
        Self::add(host, ctx.address, hook_and_data, is_validation)
    }
    
    pub(crate) fn add(host: &mut Host, account: Address, hook_and_data: &[u8], is_validation: bool) -> Result<()> {
        let (hook, init_data) = split_address(hook_and_data).ok_or(AccountError::EmptyHookAddress)?;
        let contract = host.contract(&hook).ok_or(AccountError::HookErc165Fail(hook))?;
        let supported = if is_validation {
            probe(contract.as_ref(), InterfaceId::validation_hook(), |c| c.as_validation_hook()).is_some()
        } else {
            probe(contract.as_ref(), InterfaceId::execution_hook(), |c| c.as_execution_hook()).is_some()
        };
        if !supported {
            warn!(%account, %hook, is_validation, "hook failed interface probe");
            return Err(AccountError::HookErc165Fail(hook));
        }
        
        let max = host.config().max_hooks;
        if layout::hooks(account, is_validation).len(host)? >= max as u64 {
            return Err(AccountError::TooManyHooks { max });
        }
        
        let hook_ctx = CallContext::plain(hook, account);
        host.frame(|host| {
            insert(host, account, hook, is_validation)?;
            if is_validation {
                if let Some(handler) = contract.as_validation_hook() {
                    handler.on_install(host, &hook_ctx, init_data)?;
                }
            } else if let Some(handler) = contract.as_execution_hook() {
                handler.on_install(host, &hook_ctx, init_data)?;
            }
            Ok(())
        })?;
        
        info!(%account, %hook, is_validation, "hook added");
        host.emit(Event::HookAdded {
            account,
            hook,
            is_validation,
        })
    }
    
    /// Runs the hook's `on_remove` with `deinit_data` while it is still
    /// installed; if the callback fails nothing is removed.
    pub fn remove_hook(
        host: &mut Host,
        ctx: &CallContext,
        hook: Address,
        is_validation: bool,
        deinit_data: &[u8],
    ) -> Result<()> {
        require_self_or_module(host, ctx)?;
        
        let account = ctx.address;
        let hooks = layout::hooks(account, is_validation);
        if !hooks.contains(host, hook.as_bytes())? {
            return Err(AccountError::NotRegistered(if is_validation {
                "validation hook"
            } else {
                "execution hook"
            }));
        }
        
        let contract = host.contract(&hook);
        let hook_ctx = CallContext::plain(hook, account);
        host.frame(|host| {
            if is_validation {
                if let Some(handler) = contract.as_deref().and_then(|c| c.as_validation_hook()) {
                    handler.on_remove(host, &hook_ctx, deinit_data)?;
                }
            } else {
                if let Some(handler) = contract.as_deref().and_then(|c| c.as_execution_hook()) {
                    handler.on_remove(host, &hook_ctx, deinit_data)?;
                }
                layout::set_hook_data(host, &account, &hook, &context_key(), &[])?;
            }
            hooks.remove(host, hook.as_bytes())
        })?;
        
        info!(%account, %hook, is_validation, "hook removed");
        host.emit(Event::HookRemoved {
            account,
            hook,
            is_validation,
        })
    }
    
    /// Store `data` under `key` in the calling hook's namespace.
    pub fn set_hook_data(host: &mut Host, ctx: &CallContext, key: H256, data: &[u8]) -> Result<()> {
        require_hook(host, ctx)?;
        if key == context_key() {
            return Err(AccountError::InvalidKey(key));
        }
        layout::set_hook_data(host, &ctx.address, &ctx.caller, &key, data)
    }
    
    pub fn get_hook_data(host: &Host, account: &Address, hook: &Address, key: &H256) -> Result<Bytes> {
        layout::hook_data(host, account, hook, key)
    }
    
    pub fn list_hooks(host: &Host, account: &Address, is_validation: bool) -> Result<Vec<Address>> {
        layout::hooks(*account, is_validation).addresses(host)
    }
    
    pub fn is_hook(host: &Host, account: &Address, hook: &Address, is_validation: bool) -> Result<bool> {
        layout::hooks(*account, is_validation).contains(host, hook.as_bytes())
    }
    
    /// Run every validation hook in installation order, hook `i` receiving
    /// `hook_data[i]`. The counts must match exactly.
    pub fn run_validation_hooks(
        host: &mut Host,
        account: Address,
        signed_hash: &H256,
        tx: &Transaction,
        hook_data: &[Bytes],
    ) -> Result<()> {
        let hooks = Self::list_hooks(host, &account, true)?;
        if hooks.len() != hook_data.len() {
            warn!(%account, hooks = hooks.len(), entries = hook_data.len(), "hook data count mismatch");
            return Err(AccountError::HookDataLengthMismatch {
                expected: hooks.len(),
                actual: hook_data.len(),
            });
        }
        
        for (hook, data) in hooks.into_iter().zip(hook_data) {
            let contract = host.contract(&hook);
            let handler = contract
                .as_deref()
                .and_then(|c| c.as_validation_hook())
                .ok_or(AccountError::HookRejected { hook })?;
            let ctx = CallContext::plain(hook, account);
            
            let passed = host.frame(|host| handler.validation_hook(host, &ctx, signed_hash, tx, data))?;
            if !passed {
                warn!(%account, %hook, "validation hook rejected transaction");
                return Err(AccountError::HookRejected { hook });
            }
            debug!(%account, %hook, "validation hook passed");
        }
        Ok(())
    }
    
    /// Run every execution hook's pre-execution callback and keep the
    /// non-empty contexts for the post-execution pass.
    pub fn run_pre_execution_hooks(host: &mut Host, account: Address, tx: &Transaction) -> Result<()> {
        for hook in Self::list_hooks(host, &account, false)? {
            let contract = host.contract(&hook);
            let Some(handler) = contract.as_deref().and_then(|c| c.as_execution_hook()) else {
                continue;
            };
            let ctx = CallContext::plain(hook, account);
            
            let context = host.frame(|host| handler.pre_execution(host, &ctx, tx))?;
            if !context.is_empty() {
                layout::set_hook_data(host, &account, &hook, &context_key(), &context)?;
            }
        }
        Ok(())
    }
    
    /// Hooks are re-read after execution: a hook installed during execution
    /// has no context and is skipped, one removed during execution lost its context.
    pub fn run_post_execution_hooks(host: &mut Host, account: Address) -> Result<()> {
        let key = context_key();
        for hook in Self::list_hooks(host, &account, false)? {
            let context = layout::hook_data(host, &account, &hook, &key)?;
            if context.is_empty() {
                continue;
            }
            
            let contract = host.contract(&hook);
            if let Some(handler) = contract.as_deref().and_then(|c| c.as_execution_hook()) {
                let ctx = CallContext::plain(hook, account);
                host.frame(|host| handler.post_execution(host, &ctx, &context))?;
            }
            layout::set_hook_data(host, &account, &hook, &key, &[])?;
        }
        Ok(())
    }
}

fn insert(host: &mut Host, account: Address, hook: Address, is_validation: bool) -> Result<()> {
    if !layout::hooks(account, is_validation).insert(host, hook.as_bytes())? {
        return Err(AccountError::AlreadyRegistered(if is_validation {
            "validation hook"
        } else {
            "execution hook"
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bool_hook_data, BoolHook, Fixture, PassthroughModule, RecordingHook, RevertingHook};
    use smartwallet_types::U256;
    
    fn sample_tx(fx: &Fixture) -> Transaction {
        Transaction::new(fx.account, Address::from_low_u64_be(0xbeef), U256::zero(), Bytes::new(), 0)
    }
    
    #[test]
    fn test_hooks_keep_installation_order() {
        let mut fx = Fixture::new();
        let a = fx.deploy(BoolHook);
        let b = fx.deploy(BoolHook);
        let c = fx.deploy(BoolHook);
        for hook in [a, b, c] {
            fx.install_hook(hook, true).unwrap();
        }
        
        let ctx = fx.self_ctx();
        HookManager::remove_hook(&mut fx.host, &ctx, b, true, &[]).unwrap();
        fx.install_hook(b, true).unwrap();
        assert_eq!(HookManager::list_hooks(&fx.host, &fx.account, true).unwrap(), vec![a, c, b]);
        assert!(HookManager::list_hooks(&fx.host, &fx.account, false).unwrap().is_empty());
    }
    
    #[test]
    fn test_add_hook_shape_and_probe() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        let module = fx.deploy(PassthroughModule);
        let recorder = fx.deploy(RecordingHook);
        
        assert!(matches!(
            HookManager::add_hook(&mut fx.host, &ctx, &[0u8; 4], true),
            Err(AccountError::EmptyHookAddress)
        ));
        assert!(matches!(
            HookManager::add_hook(&mut fx.host, &ctx, module.as_bytes(), true),
            Err(AccountError::HookErc165Fail(_))
        ));
        // an execution hook cannot be installed as a validation hook
        assert!(matches!(
            HookManager::add_hook(&mut fx.host, &ctx, recorder.as_bytes(), true),
            Err(AccountError::HookErc165Fail(_))
        ));
        HookManager::add_hook(&mut fx.host, &ctx, recorder.as_bytes(), false).unwrap();
        assert!(matches!(
            HookManager::add_hook(&mut fx.host, &ctx, recorder.as_bytes(), false),
            Err(AccountError::AlreadyRegistered("execution hook"))
        ));
    }
    
    #[test]
    fn test_hook_limit() {
        let mut fx = Fixture::with_max_hooks(1);
        let first = fx.deploy(BoolHook);
        let second = fx.deploy(BoolHook);
        fx.install_hook(first, true).unwrap();
        assert!(matches!(
            fx.install_hook(second, true),
            Err(AccountError::TooManyHooks { max: 1 })
        ));
    }
    
    #[test]
    fn test_failing_on_remove_keeps_hook() {
        let mut fx = Fixture::new();
        let hook = fx.deploy(RevertingHook);
        fx.install_hook(hook, true).unwrap();
        let before = fx.host.state().clone();
        
        let ctx = fx.self_ctx();
        assert!(HookManager::remove_hook(&mut fx.host, &ctx, hook, true, b"cleanup").is_err());
        assert!(HookManager::is_hook(&fx.host, &fx.account, &hook, true).unwrap());
        assert_eq!(fx.host.state(), &before);
        
        assert!(matches!(
            HookManager::remove_hook(&mut fx.host, &ctx, hook, false, &[]),
            Err(AccountError::NotRegistered("execution hook"))
        ));
    }
    
    #[test]
    fn test_set_hook_data() {
        let mut fx = Fixture::new();
        let hook = fx.deploy(BoolHook);
        let key = H256::repeat_byte(0x01);
        let hook_ctx = CallContext::plain(fx.account, hook);
        
        assert!(matches!(
            HookManager::set_hook_data(&mut fx.host, &hook_ctx, key, b"v"),
            Err(AccountError::NotFromHook { .. })
        ));
        
        fx.install_hook(hook, true).unwrap();
        HookManager::set_hook_data(&mut fx.host, &hook_ctx, key, b"v").unwrap();
        assert_eq!(
            HookManager::get_hook_data(&fx.host, &fx.account, &hook, &key).unwrap().as_slice(),
            b"v"
        );
        assert!(matches!(
            HookManager::set_hook_data(&mut fx.host, &hook_ctx, context_key(), b"forged"),
            Err(AccountError::InvalidKey(_))
        ));
        // the account itself is not a hook
        let self_ctx = fx.self_ctx();
        assert!(HookManager::set_hook_data(&mut fx.host, &self_ctx, key, b"v").is_err());
    }
    
    #[test]
    fn test_validation_hook_arity() {
        let mut fx = Fixture::new();
        let tx = sample_tx(&fx);
        let hash = H256::repeat_byte(0x33);
        
        HookManager::run_validation_hooks(&mut fx.host, fx.account, &hash, &tx, &[]).unwrap();
        assert!(matches!(
            HookManager::run_validation_hooks(&mut fx.host, fx.account, &hash, &tx, &[bool_hook_data(false)]),
            Err(AccountError::HookDataLengthMismatch { expected: 0, actual: 1 })
        ));
        
        let hook = fx.deploy(BoolHook);
        fx.install_hook(hook, true).unwrap();
        assert!(HookManager::run_validation_hooks(&mut fx.host, fx.account, &hash, &tx, &[]).is_err());
        assert!(matches!(
            HookManager::run_validation_hooks(&mut fx.host, fx.account, &hash, &tx, &[bool_hook_data(true)]),
            Err(AccountError::HookRejected { hook: h }) if h == hook
        ));
        HookManager::run_validation_hooks(&mut fx.host, fx.account, &hash, &tx, &[bool_hook_data(false)]).unwrap();
    }
    
    #[test]
    fn test_execution_hook_contexts() {
        let mut fx = Fixture::new();
        let hook = fx.deploy(RecordingHook);
        fx.install_hook(hook, false).unwrap();
        let tx = sample_tx(&fx);
        
        HookManager::run_pre_execution_hooks(&mut fx.host, fx.account, &tx).unwrap();
        assert!(!HookManager::get_hook_data(&fx.host, &fx.account, &hook, &context_key())
            .unwrap()
            .is_empty());
        
        HookManager::run_post_execution_hooks(&mut fx.host, fx.account).unwrap();
        assert_eq!(RecordingHook::counts(&fx.host, &hook, &fx.account).unwrap(), (1, 1));
        assert!(HookManager::get_hook_data(&fx.host, &fx.account, &hook, &context_key())
            .unwrap()
            .is_empty());
        
        // no context, no post call
        HookManager::run_post_execution_hooks(&mut fx.host, fx.account).unwrap();
        assert_eq!(RecordingHook::counts(&fx.host, &hook, &fx.account).unwrap(), (1, 1));
    }
}
