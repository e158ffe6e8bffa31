use crate::{
    auth::{require_self_or_module, CallContext},
    events::Event,
    host::Host,
    layout, AccountError, Keyspace, Result,
};
use smartwallet_crypto::R1PublicKey;
use smartwallet_types::{Address, Bytes};
use tracing::{info, warn};

/// Uncompressed P-256 point without the `0x04` tag.
pub const R1_KEY_LENGTH: usize = R1PublicKey::LEN;

pub struct OwnerManager;

impl OwnerManager {
    pub fn add_owner(host: &mut Host, ctx: &CallContext, keyspace: Keyspace, key: &[u8]) -> Result<()> {
        require_self_or_module(host, ctx)?;
        Self::add(host, ctx.address, keyspace, key)
    }
    
    pub fn remove_owner(host: &mut Host, ctx: &CallContext, keyspace: Keyspace, key: &[u8]) -> Result<()> {
        require_self_or_module(host, ctx)?;
        check_key(keyspace, key)?;
        
        let account = ctx.address;
        let owners = layout::owners(account, keyspace);
        if !owners.contains(host, key)? {
            return Err(AccountError::NotRegistered(label(keyspace)));
        }
        if keyspace == Keyspace::R1 && owners.len(host)? <= 1 {
            warn!(%account, "refusing to remove the last r1 owner");
            return Err(AccountError::EmptyR1Owners);
        }
        
        owners.remove(host, key)?;
        info!(%account, %keyspace, "owner removed");
        host.emit(Event::OwnerRemoved {
            account,
            keyspace,
            key: Bytes::from_slice(key),
        })
    }
    
    /// Replace every R1 and K1 owner with the single R1 key `r1_key`.
    pub fn reset_owners(host: &mut Host, ctx: &CallContext, r1_key: &[u8]) -> Result<()> {
        require_self_or_module(host, ctx)?;
        check_key(Keyspace::R1, r1_key)?;
        
        let account = ctx.address;
        layout::owners(account, Keyspace::R1).clear(host)?;
        layout::owners(account, Keyspace::K1).clear(host)?;
        layout::owners(account, Keyspace::R1).insert(host, r1_key)?;
        
        info!(%account, caller = %ctx.caller, "owners reset");
        host.emit(Event::OwnersReset {
            account,
            r1_owner: Bytes::from_slice(r1_key),
        })
    }
    
    /// Unchecked insert, used by initialization and the public entry point.
    pub(crate) fn add(host: &mut Host, account: Address, keyspace: Keyspace, key: &[u8]) -> Result<()> {
        check_key(keyspace, key)?;
        if !layout::owners(account, keyspace).insert(host, key)? {
            return Err(AccountError::AlreadyRegistered(label(keyspace)));
        }
        
        info!(%account, %keyspace, "owner added");
        host.emit(Event::OwnerAdded {
            account,
            keyspace,
            key: Bytes::from_slice(key),
        })
    }
    
    pub fn list_owners(host: &Host, account: &Address, keyspace: Keyspace) -> Result<Vec<Bytes>> {
        Ok(layout::owners(*account, keyspace)
            .members(host)?
            .into_iter()
            .map(Bytes::from_vec)
            .collect())
    }
    
    pub fn is_owner(host: &Host, account: &Address, keyspace: Keyspace, key: &[u8]) -> Result<bool> {
        layout::owners(*account, keyspace).contains(host, key)
    }
    
    pub fn r1_owners(host: &Host, account: &Address) -> Result<Vec<R1PublicKey>> {
        layout::owners(*account, Keyspace::R1)
            .members(host)?
            .iter()
            .map(|key| R1PublicKey::from_slice(key).map_err(AccountError::from))
            .collect()
    }
    
    pub fn k1_owners(host: &Host, account: &Address) -> Result<Vec<Address>> {
        layout::owners(*account, Keyspace::K1).addresses(host)
    }
}

fn check_key(keyspace: Keyspace, key: &[u8]) -> Result<()> {
    match keyspace {
        Keyspace::R1 if key.len() != R1_KEY_LENGTH => Err(AccountError::InvalidKeyLength {
            expected: R1_KEY_LENGTH,
            actual: key.len(),
        }),
        Keyspace::K1 if key.len() != Address::LEN => Err(AccountError::InvalidKeyLength {
            expected: Address::LEN,
            actual: key.len(),
        }),
        Keyspace::K1 if key.iter().all(|b| *b == 0) => Err(AccountError::InvalidAddress),
        _ => Ok(()),
    }
}

fn label(keyspace: Keyspace) -> &'static str {
    match keyspace {
        Keyspace::R1 => "r1 owner",
        Keyspace::K1 => "k1 owner",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    
    fn stranger() -> Address {
        Address::from_low_u64_be(0xdead)
    }
    
    #[test]
    fn test_add_and_remove_r1_owner() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        let second = [7u8; 64];
        
        OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::R1, &second).unwrap();
        let owners = OwnerManager::list_owners(&fx.host, &fx.account, Keyspace::R1).unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[1].as_slice(), &second[..]);
        
        let original = fx.r1_key.public_key();
        OwnerManager::remove_owner(&mut fx.host, &ctx, Keyspace::R1, original.as_bytes()).unwrap();
        assert!(!OwnerManager::is_owner(&fx.host, &fx.account, Keyspace::R1, original.as_bytes()).unwrap());
    }
    
    #[test]
    fn test_last_r1_owner_cannot_be_removed() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        let before = fx.host.state().clone();
        
        let err = OwnerManager::remove_owner(
            &mut fx.host,
            &ctx,
            Keyspace::R1,
            fx.r1_key.public_key().as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, AccountError::EmptyR1Owners));
        assert_eq!(fx.host.state(), &before);
    }
    
    #[test]
    fn test_key_shape() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        
        assert!(matches!(
            OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::R1, &[1u8; 65]),
            Err(AccountError::InvalidKeyLength { expected: 64, actual: 65 })
        ));
        assert!(matches!(
            OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::K1, Address::ZERO.as_bytes()),
            Err(AccountError::InvalidAddress)
        ));
        assert!(matches!(
            OwnerManager::reset_owners(&mut fx.host, &ctx, &[1u8; 33]),
            Err(AccountError::InvalidKeyLength { .. })
        ));
    }
    
    #[test]
    fn test_duplicate_and_missing() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        let k1 = Address::from_low_u64_be(0x51);
        
        OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::K1, k1.as_bytes()).unwrap();
        assert!(matches!(
            OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::K1, k1.as_bytes()),
            Err(AccountError::AlreadyRegistered("k1 owner"))
        ));
        
        OwnerManager::remove_owner(&mut fx.host, &ctx, Keyspace::K1, k1.as_bytes()).unwrap();
        assert!(OwnerManager::k1_owners(&fx.host, &fx.account).unwrap().is_empty());
        assert!(matches!(
            OwnerManager::remove_owner(&mut fx.host, &ctx, Keyspace::K1, k1.as_bytes()),
            Err(AccountError::NotRegistered("k1 owner"))
        ));
    }
    
    #[test]
    fn test_reset_owners() {
        let mut fx = Fixture::new();
        let ctx = fx.self_ctx();
        OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::R1, &[2u8; 64]).unwrap();
        OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::K1, stranger().as_bytes()).unwrap();
        
        OwnerManager::reset_owners(&mut fx.host, &ctx, &[9u8; 64]).unwrap();
        let r1 = OwnerManager::list_owners(&fx.host, &fx.account, Keyspace::R1).unwrap();
        assert_eq!(r1, vec![Bytes::from_slice(&[9u8; 64])]);
        assert!(OwnerManager::k1_owners(&fx.host, &fx.account).unwrap().is_empty());
    }
    
    #[test]
    fn test_unauthorized() {
        let mut fx = Fixture::new();
        let ctx = CallContext::plain(fx.account, stranger());
        let before = fx.host.state().clone();
        
        assert!(matches!(
            OwnerManager::add_owner(&mut fx.host, &ctx, Keyspace::R1, &[3u8; 64]),
            Err(AccountError::Unauthorized { .. })
        ));
        assert!(matches!(
            OwnerManager::reset_owners(&mut fx.host, &ctx, &[3u8; 64]),
            Err(AccountError::Unauthorized { .. })
        ));
        assert_eq!(fx.host.state(), &before);
    }
}
