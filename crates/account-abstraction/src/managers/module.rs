use crate::{
    auth::{require_module, require_self_or_module, CallContext},
    events::Event,
    host::Host,
    interfaces::{probe, InterfaceId},
    layout, AccountError, Result,
};
use smartwallet_types::{Address, Bytes, U256};
use tracing::{debug, info, warn};

pub struct ModuleManager;

impl ModuleManager {
    /// `module_and_data` is the module address followed by its init payload.
    pub fn add_module(host: &mut Host, ctx: &CallContext, module_and_data: &[u8]) -> Result<()> {
        require_self_or_module(host, ctx)?;
        Self::add(host, ctx.address, module_and_data)
    }
    
    pub(crate) fn add(host: &mut Host, account: Address, module_and_data: &[u8]) -> Result<()> {
        let (module, init_data) = split_address(module_and_data).ok_or(AccountError::EmptyModuleAddress)?;
        
        let contract = host.contract(&module);
        let handler = contract
            .as_deref()
            .and_then(|c| probe(c, InterfaceId::module(), |c| c.as_module()));
        let Some(handler) = handler else {
            warn!(%account, %module, "module failed interface probe");
            return Err(AccountError::ModuleErc165Fail(module));
        };
        
        host.frame(|host| {
            if !layout::modules(account).insert(host, module.as_bytes())? {
                return Err(AccountError::AlreadyRegistered("module"));
            }
            handler.init(host, &CallContext::plain(module, account), init_data)
        })?;
        
        info!(%account, %module, "module added");
        host.emit(Event::ModuleAdded { account, module })
    }
    
    /// The module's `disable` callback runs while it is still installed;
    /// it is deregistered only once the callback succeeds.
    pub fn remove_module(host: &mut Host, ctx: &CallContext, module: Address) -> Result<()> {
        require_self_or_module(host, ctx)?;
        
        let account = ctx.address;
        if !layout::modules(account).contains(host, module.as_bytes())? {
            return Err(AccountError::NotRegistered("module"));
        }
        
        let contract = host.contract(&module);
        host.frame(|host| {
            if let Some(handler) = contract.as_deref().and_then(|c| c.as_module()) {
                handler.disable(host, &CallContext::plain(module, account))?;
            }
            layout::modules(account).remove(host, module.as_bytes())
        })?;
        info!(%account, %module, "module removed");
        host.emit(Event::ModuleRemoved { account, module })
    }
    
    /// Call `to` from the account on behalf of an installed module. No
    /// signature is checked: installing a module delegates full control.
    pub fn execute_from_module(
        host: &mut Host,
        ctx: &CallContext,
        to: Address,
        value: U256,
        data: &[u8],
    ) -> Result<Bytes> {
        require_module(host, ctx)?;
        if to == ctx.address {
            return Err(AccountError::RecursiveModuleCall);
        }
        
        debug!(account = %ctx.address, module = %ctx.caller, %to, %value, "execute from module");
        host.call(ctx.address, to, value, data)
    }
    
    pub fn list_modules(host: &Host, account: &Address) -> Result<Vec<Address>> {
        layout::modules(*account).addresses(host)
    }
    
    pub fn is_module(host: &Host, account: &Address, module: &Address) -> Result<bool> {
        layout::modules(*account).contains(host, module.as_bytes())
    }
}

/// Splits `address || payload`; None if shorter than an address.
pub(crate) fn split_address(data: &[u8]) -> Option<(Address, &[u8])> {
    if data.len() < Address::LEN {
        return None;
    }
    let (head, tail) = data.split_at(Address::LEN);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(head);
    Some((Address::from_bytes(bytes), tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, PassthroughModule};
    use std::sync::Arc;
    
    fn install(fx: &mut Fixture, module: Address, init: &[u8]) -> Result<()> {
        let ctx = fx.self_ctx();
        let mut payload = module.as_bytes().to_vec();
        payload.extend_from_slice(init);
        ModuleManager::add_module(&mut fx.host, &ctx, &payload)
    }
    
    #[test]
    fn test_add_runs_init() {
        let mut fx = Fixture::new();
        let module = fx.deploy_passthrough_module();
        
        install(&mut fx, module, b"hello").unwrap();
        assert!(ModuleManager::is_module(&fx.host, &fx.account, &module).unwrap());
        assert_eq!(
            PassthroughModule::init_data(&fx.host, &module, &fx.account).unwrap(),
            Some(b"hello".to_vec())
        );
        assert!(matches!(
            install(&mut fx, module, b""),
            Err(AccountError::AlreadyRegistered("module"))
        ));
    }
    
    #[test]
    fn test_payload_shape_and_probe() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        
        assert!(matches!(
            ModuleManager::add_module(&mut fx.host, &ctx, &[1u8; 19]),
            Err(AccountError::EmptyModuleAddress)
        ));
        let validator = fx.r1_validator;
        assert!(matches!(
            install(&mut fx, validator, &[]),
            Err(AccountError::ModuleErc165Fail(_))
        ));
    }
    
    #[test]
    fn test_remove_runs_disable_before_deregistering() {
        let mut fx = Fixture::new();
        let module = fx.deploy_passthrough_module();
        install(&mut fx, module, b"x").unwrap();
        
        let ctx = fx.self_ctx();
        ModuleManager::remove_module(&mut fx.host, &ctx, module).unwrap();
        assert!(ModuleManager::list_modules(&fx.host, &fx.account).unwrap().is_empty());
        assert_eq!(PassthroughModule::init_data(&fx.host, &module, &fx.account).unwrap(), None);
        assert!(matches!(
            ModuleManager::remove_module(&mut fx.host, &ctx, module),
            Err(AccountError::NotRegistered("module"))
        ));
    }
    
    #[test]
    fn test_execute_from_module() {
        let mut fx = Fixture::new();
        let module = fx.deploy_passthrough_module();
        let target = Address::from_low_u64_be(0xbeef);
        let ctx = CallContext::plain(fx.account, module);
        
        assert!(matches!(
            ModuleManager::execute_from_module(&mut fx.host, &ctx, target, U256::one(), &[]),
            Err(AccountError::NotFromModule { .. })
        ));
        
        install(&mut fx, module, &[]).unwrap();
        ModuleManager::execute_from_module(&mut fx.host, &ctx, target, U256::one(), &[]).unwrap();
        assert_eq!(fx.host.balance(&target).unwrap(), U256::one());
        
        assert!(matches!(
            ModuleManager::execute_from_module(&mut fx.host, &ctx, fx.account, U256::zero(), &[]),
            Err(AccountError::RecursiveModuleCall)
        ));
    }
    
    #[test]
    fn test_failing_init_leaves_no_trace() {
        let mut fx = Fixture::new();
        let module = Address::from_low_u64_be(0x7777);
        fx.host.deploy_contract(module, Arc::new(PassthroughModule));
        let before = fx.host.state().clone();
        
        // the passthrough module rejects this init payload
        assert!(install(&mut fx, module, PassthroughModule::REJECT).is_err());
        assert_eq!(fx.host.state(), &before);
    }
}
