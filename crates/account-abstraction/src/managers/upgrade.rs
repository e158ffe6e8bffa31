use crate::{
    auth::{require_self, CallContext},
    events::Event,
    host::Host,
    layout, AccountError, Result,
};
use smartwallet_types::Address;
use tracing::info;

pub struct UpgradeManager;

impl UpgradeManager {
    /// Point the account at `new_implementation`. Only the account itself may
    /// upgrade; installed modules are refused.
    pub fn upgrade_to(host: &mut Host, ctx: &CallContext, new_implementation: Address) -> Result<()> {
        require_self(ctx)?;
        
        let account = ctx.address;
        let current = Self::implementation(host, &account)?;
        if new_implementation == current {
            return Err(AccountError::SameImplementation(new_implementation));
        }
        
        let target_schema = host
            .implementation_schema(&new_implementation)
            .ok_or(AccountError::NotAnImplementation(new_implementation))?;
        let account_schema = layout::schema_version(host, &account)?;
        if target_schema != account_schema {
            return Err(AccountError::IncompatibleImplementation {
                expected: account_schema,
                actual: target_schema,
            });
        }
        
        layout::set_implementation(host, &account, &new_implementation)?;
        info!(%account, from = %current, to = %new_implementation, "account upgraded");
        host.emit(Event::Upgraded {
            account,
            old_implementation: current,
            new_implementation,
        })
    }
    
    pub fn implementation(host: &Host, account: &Address) -> Result<Address> {
        layout::implementation(host, account)?.ok_or(AccountError::NotAnAccount(*account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{implementation_v1, implementation_v2, Fixture};
    
    #[test]
    fn test_upgrade() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        
        assert!(matches!(
            UpgradeManager::upgrade_to(&mut fx.host, &ctx, implementation_v1()),
            Err(AccountError::SameImplementation(_))
        ));
        UpgradeManager::upgrade_to(&mut fx.host, &ctx, implementation_v2()).unwrap();
        assert_eq!(
            UpgradeManager::implementation(&fx.host, &fx.account).unwrap(),
            implementation_v2()
        );
    }
    
    #[test]
    fn test_modules_cannot_upgrade() {
        let mut fx = Fixture::new();
        let module = fx.deploy_passthrough_module();
        fx.install_module(module, &[]).unwrap();
        
        let ctx = CallContext::plain(fx.account, module);
        assert!(matches!(
            UpgradeManager::upgrade_to(&mut fx.host, &ctx, implementation_v2()),
            Err(AccountError::Unauthorized { .. })
        ));
    }
    
    #[test]
    fn test_schema_checks() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        let unknown = Address::from_low_u64_be(0x2fff);
        let incompatible = Address::from_low_u64_be(0x2ffe);
        fx.host.register_implementation(incompatible, 2);
        
        assert!(matches!(
            UpgradeManager::upgrade_to(&mut fx.host, &ctx, unknown),
            Err(AccountError::NotAnImplementation(a)) if a == unknown
        ));
        assert!(matches!(
            UpgradeManager::upgrade_to(&mut fx.host, &ctx, incompatible),
            Err(AccountError::IncompatibleImplementation { expected: 1, actual: 2 })
        ));
    }
}
