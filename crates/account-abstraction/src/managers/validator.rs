use crate::{
    auth::{require_self_or_module, CallContext},
    events::Event,
    host::Host,
    interfaces::{probe, InterfaceId},
    layout, AccountError, Keyspace, Result,
};
use smartwallet_types::Address;
use tracing::{info, warn};

pub struct ValidatorManager;

impl ValidatorManager {
    pub fn add_validator(host: &mut Host, ctx: &CallContext, keyspace: Keyspace, validator: Address) -> Result<()> {
        require_self_or_module(host, ctx)?;
        Self::add(host, ctx.address, keyspace, validator)
    }
    
    pub fn remove_validator(host: &mut Host, ctx: &CallContext, keyspace: Keyspace, validator: Address) -> Result<()> {
        require_self_or_module(host, ctx)?;
        
        let account = ctx.address;
        let validators = layout::validators(account, keyspace);
        if !validators.contains(host, validator.as_bytes())? {
            return Err(AccountError::NotRegistered(label(keyspace)));
        }
        if keyspace == Keyspace::R1 && validators.len(host)? <= 1 {
            warn!(%account, %validator, "refusing to remove the last r1 validator");
            return Err(AccountError::EmptyR1Validators);
        }
        
        validators.remove(host, validator.as_bytes())?;
        info!(%account, %keyspace, %validator, "validator removed");
        host.emit(Event::ValidatorRemoved {
            account,
            keyspace,
            validator,
        })
    }
    
    pub(crate) fn add(host: &mut Host, account: Address, keyspace: Keyspace, validator: Address) -> Result<()> {
        if !Self::supports(host, keyspace, &validator) {
            warn!(%account, %validator, %keyspace, "validator failed interface probe");
            return Err(AccountError::ValidatorErc165Fail(validator));
        }
        if !layout::validators(account, keyspace).insert(host, validator.as_bytes())? {
            return Err(AccountError::AlreadyRegistered(label(keyspace)));
        }
        
        info!(%account, %keyspace, %validator, "validator added");
        host.emit(Event::ValidatorAdded {
            account,
            keyspace,
            validator,
        })
    }
    
    fn supports(host: &Host, keyspace: Keyspace, validator: &Address) -> bool {
        let Some(contract) = host.contract(validator) else {
            return false;
        };
        match keyspace {
            Keyspace::R1 => {
                probe(contract.as_ref(), InterfaceId::r1_validator(), |c| c.as_r1_validator()).is_some()
            }
            Keyspace::K1 => {
                probe(contract.as_ref(), InterfaceId::k1_validator(), |c| c.as_k1_validator()).is_some()
            }
        }
    }
    
    pub fn list_validators(host: &Host, account: &Address, keyspace: Keyspace) -> Result<Vec<Address>> {
        layout::validators(*account, keyspace).addresses(host)
    }
    
    pub fn is_validator(host: &Host, account: &Address, keyspace: Keyspace, validator: &Address) -> Result<bool> {
        layout::validators(*account, keyspace).contains(host, validator.as_bytes())
    }
    
    /// Keyspace `validator` is registered under on `account`, if any.
    pub fn keyspace_of(host: &Host, account: &Address, validator: &Address) -> Result<Option<Keyspace>> {
        for keyspace in [Keyspace::R1, Keyspace::K1] {
            if Self::is_validator(host, account, keyspace, validator)? {
                return Ok(Some(keyspace));
            }
        }
        Ok(None)
    }
}

fn label(keyspace: Keyspace) -> &'static str {
    match keyspace {
        Keyspace::R1 => "r1 validator",
        Keyspace::K1 => "k1 validator",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, PassthroughModule};
    use crate::validators::TeeValidator;
    use std::sync::Arc;
    
    #[test]
    fn test_probe_gates_registration() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        let before = fx.host.state().clone();
        
        // a K1 validator is not an R1 validator
        assert!(matches!(
            ValidatorManager::add_validator(&mut fx.host, &ctx, Keyspace::R1, fx.k1_validator),
            Err(AccountError::ValidatorErc165Fail(v)) if v == fx.k1_validator
        ));
        // an address without code
        let eoa = Address::from_low_u64_be(0x1234);
        assert!(matches!(
            ValidatorManager::add_validator(&mut fx.host, &ctx, Keyspace::K1, eoa),
            Err(AccountError::ValidatorErc165Fail(_))
        ));
        // a module
        let module = Address::from_low_u64_be(0x4321);
        fx.host.deploy_contract(module, Arc::new(PassthroughModule));
        assert!(ValidatorManager::add_validator(&mut fx.host, &ctx, Keyspace::K1, module).is_err());
        assert_eq!(fx.host.state(), &before);
    }
    
    #[test]
    fn test_last_r1_validator_is_kept() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        
        assert!(matches!(
            ValidatorManager::remove_validator(&mut fx.host, &ctx, Keyspace::R1, fx.r1_validator),
            Err(AccountError::EmptyR1Validators)
        ));
        
        let second = Address::from_low_u64_be(0x1003);
        fx.host.deploy_contract(second, Arc::new(TeeValidator));
        ValidatorManager::add_validator(&mut fx.host, &ctx, Keyspace::R1, second).unwrap();
        ValidatorManager::remove_validator(&mut fx.host, &ctx, Keyspace::R1, fx.r1_validator).unwrap();
        assert_eq!(
            ValidatorManager::list_validators(&fx.host, &fx.account, Keyspace::R1).unwrap(),
            vec![second]
        );
    }
    
    #[test]
    fn test_k1_validators_may_become_empty() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        
        ValidatorManager::add_validator(&mut fx.host, &ctx, Keyspace::K1, fx.k1_validator).unwrap();
        assert_eq!(
            ValidatorManager::keyspace_of(&fx.host, &fx.account, &fx.k1_validator).unwrap(),
            Some(Keyspace::K1)
        );
        assert!(matches!(
            ValidatorManager::add_validator(&mut fx.host, &ctx, Keyspace::K1, fx.k1_validator),
            Err(AccountError::AlreadyRegistered("k1 validator"))
        ));
        
        ValidatorManager::remove_validator(&mut fx.host, &ctx, Keyspace::K1, fx.k1_validator).unwrap();
        assert!(ValidatorManager::list_validators(&fx.host, &fx.account, Keyspace::K1)
            .unwrap()
            .is_empty());
        assert!(matches!(
            ValidatorManager::remove_validator(&mut fx.host, &ctx, Keyspace::K1, fx.k1_validator),
            Err(AccountError::NotRegistered(_))
        ));
    }
}
