//! The smart account contract: self/module call dispatch into the managers,
//! and the bootloader-facing validation and execution entry points.

use crate::{
    auth::{require_bootloader, CallContext},
    batch::BatchCaller,
    bootloader::Stage,
    host::Host,
    interfaces::Contract,
    layout,
    managers::{HookManager, ModuleManager, OwnerManager, UpgradeManager, ValidatorManager},
    AccountError, Keyspace, Result,
};
use alloy_primitives::{FixedBytes, U256 as AlloyU256};
use alloy_sol_types::{sol, Eip712Domain, SolInterface, SolStruct, SolValue};
use smartwallet_core::{
    abi::{IAccount::IAccountCalls, EIP1271_MAGIC_VALUE},
    GasCost, MessageSignature, SignatureEnvelope, Transaction,
};
use smartwallet_types::{Address, Bytes, HashExt, UintExt, H256, U256};
use std::borrow::Cow;
use tracing::{debug, info, warn};

sol! {
    struct AccountMessage {
        bytes32 signedHash;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SmartAccount;

impl SmartAccount {
    /// Seed a fresh account with one R1 owner, one R1 validator and the given
    /// `module || initData` payloads.
    pub fn initialize(
        host: &mut Host,
        account: Address,
        implementation: Address,
        r1_owner: &[u8],
        r1_validator: Address,
        modules: &[Bytes],
    ) -> Result<()> {
        if layout::implementation(host, &account)?.is_some() {
            return Err(AccountError::AlreadyInitialized(account));
        }
        let schema = host
            .implementation_schema(&implementation)
            .ok_or(AccountError::NotAnImplementation(implementation))?;
        
        layout::set_implementation(host, &account, &implementation)?;
        layout::set_schema_version(host, &account, schema)?;
        OwnerManager::add(host, account, Keyspace::R1, r1_owner)?;
        ValidatorManager::add(host, account, Keyspace::R1, r1_validator)?;
        for module in modules {
            ModuleManager::add(host, account, module)?;
        }
        Ok(())
    }
    
    fn dispatch(host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<Bytes> {
        if data.is_empty() {
            return Ok(Bytes::new());
        }
        
        match IAccountCalls::abi_decode(data, true)? {
            IAccountCalls::r1AddOwner(c) => OwnerManager::add_owner(host, ctx, Keyspace::R1, &c.pubKey)?,
            IAccountCalls::k1AddOwner(c) => {
                OwnerManager::add_owner(host, ctx, Keyspace::K1, Address::from(c.addr).as_bytes())?
            }
            IAccountCalls::r1RemoveOwner(c) => {
                OwnerManager::remove_owner(host, ctx, Keyspace::R1, &c.pubKey)?
            }
            IAccountCalls::k1RemoveOwner(c) => {
                OwnerManager::remove_owner(host, ctx, Keyspace::K1, Address::from(c.addr).as_bytes())?
            }
            IAccountCalls::resetOwners(c) => OwnerManager::reset_owners(host, ctx, &c.pubKey)?,
            IAccountCalls::r1AddValidator(c) => {
                ValidatorManager::add_validator(host, ctx, Keyspace::R1, c.validator.into())?
            }
            IAccountCalls::k1AddValidator(c) => {
                ValidatorManager::add_validator(host, ctx, Keyspace::K1, c.validator.into())?
            }
            IAccountCalls::r1RemoveValidator(c) => {
                ValidatorManager::remove_validator(host, ctx, Keyspace::R1, c.validator.into())?
            }
            IAccountCalls::k1RemoveValidator(c) => {
                ValidatorManager::remove_validator(host, ctx, Keyspace::K1, c.validator.into())?
            }
            IAccountCalls::addModule(c) => ModuleManager::add_module(host, ctx, &c.moduleAndData)?,
            IAccountCalls::removeModule(c) => ModuleManager::remove_module(host, ctx, c.module.into())?,
            IAccountCalls::addHook(c) => {
                HookManager::add_hook(host, ctx, &c.hookAndData, c.isValidation)?
            }
            IAccountCalls::removeHook(c) => {
                HookManager::remove_hook(host, ctx, c.hook.into(), c.isValidation, &c.deinitData)?
            }
            IAccountCalls::setHookData(c) => {
                HookManager::set_hook_data(host, ctx, H256::from(c.key.0), &c.data)?
            }
            IAccountCalls::upgradeTo(c) => {
                UpgradeManager::upgrade_to(host, ctx, c.newImplementation.into())?
            }
            IAccountCalls::executeFromModule(c) => {
                return ModuleManager::execute_from_module(
                    host,
                    ctx,
                    c.to.into(),
                    U256::from_alloy(c.value),
                    &c.data,
                );
            }
            IAccountCalls::isValidSignature(c) => {
                let valid = Self::is_valid_signature(host, ctx.address, &H256::from(c.hash.0), &c.signature)?;
                let magic = if valid { EIP1271_MAGIC_VALUE } else { [0u8; 4] };
                return Ok(Bytes::from_vec(FixedBytes::<4>::from(magic).abi_encode()));
            }
        }
        Ok(Bytes::new())
    }
    
    /// Check `signature` over `signed_hash` with `validator`: an R1 validator
    /// must accept it for some R1 owner, a K1 validator must recover a K1 owner.
    pub fn check_signature(
        host: &mut Host,
        account: Address,
        signed_hash: &H256,
        signature: &[u8],
        validator: Address,
    ) -> Result<()> {
        let keyspace = ValidatorManager::keyspace_of(host, &account, &validator)?
            .ok_or(AccountError::UnknownValidator(validator))?;
        let contract = host
            .contract(&validator)
            .ok_or(AccountError::UnknownValidator(validator))?;
        
        match keyspace {
            Keyspace::R1 => {
                let checker = contract
                    .as_r1_validator()
                    .ok_or(AccountError::UnknownValidator(validator))?;
                for owner in OwnerManager::r1_owners(host, &account)? {
                    host.charge(GasCost::P256VERIFY)?;
                    if checker.validate_signature(signed_hash, signature, &owner) {
                        debug!(%account, %validator, "r1 signature accepted");
                        return Ok(());
                    }
                }
            }
            Keyspace::K1 => {
                let checker = contract
                    .as_k1_validator()
                    .ok_or(AccountError::UnknownValidator(validator))?;
                host.charge(GasCost::ECRECOVER)?;
                let signer = checker.validate_signature(signed_hash, signature);
                if !signer.is_zero()
                    && OwnerManager::is_owner(host, &account, Keyspace::K1, signer.as_bytes())?
                {
                    debug!(%account, %validator, %signer, "k1 signature accepted");
                    return Ok(());
                }
            }
        }
        
        warn!(%account, %validator, %keyspace, "signature rejected");
        Err(AccountError::SignatureRejected { validator })
    }
    
    /// EIP-712 digest an owner signs to authorize the message hash `hash`.
    pub fn message_digest(chain_id: u64, account: Address, hash: &H256) -> H256 {
        let domain = Eip712Domain::new(
            Some(Cow::Borrowed("SmartWallet")),
            Some(Cow::Borrowed("1.0.0")),
            Some(AlloyU256::from(chain_id)),
            Some(account.into()),
            None,
        );
        let message = AccountMessage {
            signedHash: hash.to_alloy(),
        };
        H256::from_alloy(message.eip712_signing_hash(&domain))
    }
    
    /// EIP-1271 check. `signature` is `abi.encode(bytes sig, address validator)`.
    pub fn is_valid_signature(host: &mut Host, account: Address, hash: &H256, signature: &[u8]) -> Result<bool> {
        let message = MessageSignature::decode(signature)?;
        let digest = Self::message_digest(host.chain_id(), account, hash);
        match Self::check_signature(host, account, &digest, &message.signature, message.validator) {
            Ok(()) => Ok(true),
            Err(AccountError::SignatureRejected { .. }) | Err(AccountError::UnknownValidator(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
    
    /// Nonce, signature and validation hooks, in that order. `stage` records
    /// how far validation got.
    pub fn validate_transaction(
        host: &mut Host,
        ctx: &CallContext,
        signed_hash: &H256,
        tx: &Transaction,
        stage: &mut Stage,
    ) -> Result<()> {
        require_bootloader(host, ctx)?;
        let account = ctx.address;
        
        let expected = layout::nonce(host, &account)?;
        if tx.nonce != expected {
            return Err(AccountError::NonceMismatch {
                expected,
                actual: tx.nonce,
            });
        }
        layout::set_nonce(host, &account, expected + 1)?;
        
        let envelope = SignatureEnvelope::decode(&tx.signature)?;
        Self::check_signature(host, account, signed_hash, &envelope.signature, envelope.validator)?;
        *stage = Stage::ValidatorChecked;
        
        HookManager::run_validation_hooks(host, account, signed_hash, tx, &envelope.hook_data)?;
        *stage = Stage::HooksChecked;
        Ok(())
    }
    
    /// Pay the transaction fee to the bootloader out of the account balance.
    pub fn pay_for_transaction(host: &mut Host, ctx: &CallContext, fee: U256) -> Result<()> {
        require_bootloader(host, ctx)?;
        host.transfer(ctx.address, ctx.caller, fee)
    }
    
    /// Execute the transaction's call, wrapped in the execution hooks. Calls
    /// to the batch caller run as a batch in the account's own context.
    pub fn execute_transaction(host: &mut Host, ctx: &CallContext, tx: &Transaction) -> Result<Bytes> {
        require_bootloader(host, ctx)?;
        let account = ctx.address;
        
        HookManager::run_pre_execution_hooks(host, account, tx)?;
        let output = if tx.to == host.config().batch_caller {
            BatchCaller::execute(host, account, tx.value, &tx.data)?
        } else {
            host.call(account, tx.to, tx.value, &tx.data)?
        };
        HookManager::run_post_execution_hooks(host, account)?;
        
        info!(%account, to = %tx.to, nonce = tx.nonce, "transaction executed");
        Ok(output)
    }
}

impl Contract for SmartAccount {
    fn call(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<Bytes> {
        Self::dispatch(host, ctx, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use alloy_sol_types::SolCall;
    use smartwallet_core::abi::IAccount;
    use smartwallet_crypto::{address_of, generate_private_key, sign_hash};
    
    #[test]
    fn test_initialize_twice() {
        let mut fx = Fixture::new();
        let owner = fx.r1_key.public_key();
        let err = SmartAccount::initialize(
            &mut fx.host,
            fx.account,
            crate::testing::implementation_v1(),
            owner.as_bytes(),
            fx.r1_validator,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, AccountError::AlreadyInitialized(_)));
    }
    
    #[test]
    fn test_self_call_dispatch() {
        let mut fx = Fixture::new();
        let data = IAccount::r1AddOwnerCall {
            pubKey: vec![5u8; 64].into(),
        }
        .abi_encode();
        
        fx.host.call(fx.account, fx.account, U256::zero(), &data).unwrap();
        assert!(OwnerManager::is_owner(&fx.host, &fx.account, Keyspace::R1, &[5u8; 64]).unwrap());
        
        // same call from outside is refused and leaves nothing behind
        let outsider = Address::from_low_u64_be(0x0b0b);
        let data = IAccount::r1AddOwnerCall {
            pubKey: vec![6u8; 64].into(),
        }
        .abi_encode();
        assert!(matches!(
            fx.host.call(outsider, fx.account, U256::zero(), &data),
            Err(AccountError::Unauthorized { .. })
        ));
    }
    
    #[test]
    fn test_garbage_calldata() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.host.call(fx.account, fx.account, U256::zero(), &[0xde, 0xad, 0xbe, 0xef]),
            Err(AccountError::Decoding(_))
        ));
        // plain transfers are accepted
        fx.host.call(fx.account, fx.account, U256::zero(), &[]).unwrap();
    }
    
    #[test]
    fn test_is_valid_signature_r1() {
        let mut fx = Fixture::new();
        let hash = H256::repeat_byte(0x21);
        let digest = SmartAccount::message_digest(fx.host.chain_id(), fx.account, &hash);
        let sig = fx.r1_key.sign_hash(&digest).unwrap();
        
        let good = MessageSignature::new(sig.to_vec(), fx.r1_validator).encode();
        assert!(SmartAccount::is_valid_signature(&mut fx.host, fx.account, &hash, &good).unwrap());
        
        // a signature over the raw hash is not accepted
        let raw = fx.r1_key.sign_hash(&hash).unwrap();
        let bad = MessageSignature::new(raw.to_vec(), fx.r1_validator).encode();
        assert!(!SmartAccount::is_valid_signature(&mut fx.host, fx.account, &hash, &bad).unwrap());
        
        let unknown = MessageSignature::new(sig.to_vec(), fx.k1_validator).encode();
        assert!(!SmartAccount::is_valid_signature(&mut fx.host, fx.account, &hash, &unknown).unwrap());
    }
    
    #[test]
    fn test_is_valid_signature_via_call() {
        let mut fx = Fixture::new();
        let secret = generate_private_key();
        fx.add_k1_owner(address_of(&secret));
        fx.enable_k1_validator();
        
        let hash = H256::repeat_byte(0x44);
        let digest = SmartAccount::message_digest(fx.host.chain_id(), fx.account, &hash);
        let sig = sign_hash(&digest, &secret).unwrap().to_bytes();
        let call = IAccount::isValidSignatureCall {
            hash: hash.to_alloy(),
            signature: MessageSignature::new(sig.to_vec(), fx.k1_validator).encode().into(),
        }
        .abi_encode();
        
        let out = fx.host.call(Address::from_low_u64_be(1), fx.account, U256::zero(), &call).unwrap();
        assert_eq!(&out[..4], &EIP1271_MAGIC_VALUE);
    }
    
    #[test]
    fn test_validation_requires_bootloader() {
        let mut fx = Fixture::new();
        let tx = Transaction::new(fx.account, fx.account, U256::zero(), Bytes::new(), 0);
        let ctx = fx.self_ctx();
        let mut stage = Stage::Unvalidated;
        
        assert!(matches!(
            SmartAccount::validate_transaction(&mut fx.host, &ctx, &H256::zero(), &tx, &mut stage),
            Err(AccountError::NotFromBootloader { .. })
        ));
        assert!(matches!(
            SmartAccount::execute_transaction(&mut fx.host, &ctx, &tx),
            Err(AccountError::NotFromBootloader { .. })
        ));
        assert!(matches!(
            SmartAccount::pay_for_transaction(&mut fx.host, &ctx, U256::one()),
            Err(AccountError::NotFromBootloader { .. })
        ));
        assert_eq!(stage, Stage::Unvalidated);
    }
}
