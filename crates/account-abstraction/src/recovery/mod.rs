//! Guardian-based ownership recovery. A recovery module is installed on an
//! account like any other module; once enough guardians approve a new R1
//! owner and the timelock has passed, it rotates the account's owners
//! through `resetOwners`.

mod cloud;
mod social;

pub use cloud::CloudRecoveryModule;
pub use social::SocialRecoveryModule;

use crate::{
    auth::CallContext,
    events::Event,
    host::Host,
    managers::R1_KEY_LENGTH,
    AccountError, Result,
};
use alloy_primitives::U256 as AlloyU256;
use alloy_sol_types::{sol, Eip712Domain, SolCall, SolInterface, SolStruct, SolValue};
use serde::{Deserialize, Serialize};
use smartwallet_core::abi::{IAccount, EIP1271_MAGIC_VALUE};
use smartwallet_crypto::{recover_address, K1Signature};
use smartwallet_types::{Address, Bytes, HashExt, H256, U256};
use std::{borrow::Cow, collections::HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

sol! {
    interface IRecoveryModule {
        struct RecoveryConfig {
            uint64 timelock;
            uint64 threshold;
            address[] guardians;
        }

        struct GuardianData {
            address guardian;
            bytes signature;
        }

        function updateConfig(RecoveryConfig config) external;
        function startRecovery(GuardianData[] guardianData, address recoveringAddress, bytes newOwner) external;
        function stopRecovery() external;
        function executeRecovery(address recoveringAddress) external;
    }

    struct RecoveryRequest {
        address recoveringAddress;
        bytes newOwner;
        uint256 nonce;
    }
}

pub use IRecoveryModule::GuardianData;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("Recovery is not configured for this account")]
    NotInitialized,
    
    #[error("Recovery is already configured for this account")]
    AlreadyInitialized,
    
    #[error("Invalid guardian threshold")]
    InvalidThreshold,
    
    #[error("{0} is not a guardian")]
    UnknownGuardian(Address),
    
    #[error("Guardian {0} listed twice")]
    DuplicateGuardian(Address),
    
    #[error("Invalid signature from guardian {0}")]
    InvalidGuardianSignature(Address),
    
    #[error("Insufficient approvals: need {required}, got {got}")]
    InsufficientApprovals { required: u64, got: u64 },
    
    #[error("A recovery is already in progress")]
    RecoveryInProgress,
    
    #[error("No recovery in progress")]
    NoRecoveryInProgress,
    
    #[error("Recovery timelock has not passed")]
    TimelockNotPassed,
}

/// Per-account guardian configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Seconds between approval and execution.
    pub timelock: u64,
    pub threshold: u64,
    pub guardians: Vec<Address>,
}

impl RecoveryConfig {
    pub fn new(timelock: u64, threshold: u64, guardians: Vec<Address>) -> Self {
        Self {
            timelock,
            threshold,
            guardians,
        }
    }
    
    /// ABI encoding used as module init data and by `updateConfig`.
    pub fn encode(&self) -> Vec<u8> {
        self.to_sol().abi_encode()
    }
    
    pub fn decode(data: &[u8]) -> Result<Self> {
        let config = IRecoveryModule::RecoveryConfig::abi_decode(data, true)?;
        Ok(Self::from_sol(config))
    }
    
    /// Threshold between 1 and the number of distinct, non-zero guardians.
    pub fn validate(&self) -> std::result::Result<(), RecoveryError> {
        let mut seen = HashSet::new();
        for guardian in &self.guardians {
            if guardian.is_zero() {
                return Err(RecoveryError::UnknownGuardian(*guardian));
            }
            if !seen.insert(*guardian) {
                return Err(RecoveryError::DuplicateGuardian(*guardian));
            }
        }
        if self.threshold == 0 || self.threshold > self.guardians.len() as u64 {
            return Err(RecoveryError::InvalidThreshold);
        }
        Ok(())
    }
    
    fn to_sol(&self) -> IRecoveryModule::RecoveryConfig {
        IRecoveryModule::RecoveryConfig {
            timelock: self.timelock,
            threshold: self.threshold,
            guardians: self.guardians.iter().map(|g| (*g).into()).collect(),
        }
    }
    
    fn from_sol(config: IRecoveryModule::RecoveryConfig) -> Self {
        Self {
            timelock: config.timelock,
            threshold: config.threshold,
            guardians: config.guardians.into_iter().map(Address::from).collect(),
        }
    }
}

/// An approved owner rotation waiting out its timelock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecovery {
    pub new_owner: Vec<u8>,
    pub execute_after: u64,
}

fn slot(account: &Address, tag: &[u8]) -> Vec<u8> {
    let mut slot = account.as_bytes().to_vec();
    slot.extend_from_slice(tag);
    slot
}

/// The guardian state machine shared by the recovery module flavours. Each
/// flavour supplies its EIP-712 name and its own config rule.
pub(crate) struct RecoveryEngine {
    pub name: &'static str,
    pub check_config: fn(&RecoveryConfig) -> std::result::Result<(), RecoveryError>,
}

impl RecoveryEngine {
    pub fn config(&self, host: &Host, module: &Address, account: &Address) -> Result<Option<RecoveryConfig>> {
        host.load(module, &slot(account, b"config"))
    }
    
    pub fn pending(&self, host: &Host, module: &Address, account: &Address) -> Result<Option<PendingRecovery>> {
        host.load(module, &slot(account, b"pending"))
    }
    
    pub fn nonce(&self, host: &Host, module: &Address, account: &Address) -> Result<u64> {
        Ok(host.load(module, &slot(account, b"nonce"))?.unwrap_or(0))
    }
    
    /// Digest guardians sign to approve `new_owner` for `account` at the
    /// module's current nonce.
    pub fn digest(&self, host: &Host, module: &Address, account: &Address, new_owner: &[u8]) -> Result<H256> {
        let domain = Eip712Domain::new(
            Some(Cow::Borrowed(self.name)),
            Some(Cow::Borrowed("1.0.0")),
            Some(AlloyU256::from(host.chain_id())),
            Some((*module).into()),
            None,
        );
        let request = RecoveryRequest {
            recoveringAddress: (*account).into(),
            newOwner: new_owner.to_vec().into(),
            nonce: AlloyU256::from(self.nonce(host, module, account)?),
        };
        Ok(H256::from_alloy(request.eip712_signing_hash(&domain)))
    }
    
    /// Module `init`: `ctx.caller` is the account installing the module.
    pub fn init(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<()> {
        let account = ctx.caller;
        if self.config(host, &ctx.address, &account)?.is_some() {
            return Err(RecoveryError::AlreadyInitialized.into());
        }
        let config = RecoveryConfig::decode(data)?;
        (self.check_config)(&config)?;
        host.store(&ctx.address, &slot(&account, b"config"), &config)?;
        info!(module = self.name, %account, guardians = config.guardians.len(), "recovery configured");
        Ok(())
    }
    
    /// Module `disable`: forget the config and any pending request. The
    /// nonce survives so old approvals stay spent.
    pub fn disable(&self, host: &mut Host, ctx: &CallContext) -> Result<()> {
        let account = ctx.caller;
        if self.config(host, &ctx.address, &account)?.is_none() {
            return Err(RecoveryError::NotInitialized.into());
        }
        host.clear(&ctx.address, &slot(&account, b"config"))?;
        host.clear(&ctx.address, &slot(&account, b"pending"))?;
        info!(module = self.name, %account, "recovery disabled");
        Ok(())
    }
    
    pub fn update_config(&self, host: &mut Host, ctx: &CallContext, config: RecoveryConfig) -> Result<()> {
        let account = ctx.caller;
        if self.config(host, &ctx.address, &account)?.is_none() {
            return Err(RecoveryError::NotInitialized.into());
        }
        if self.pending(host, &ctx.address, &account)?.is_some() {
            return Err(RecoveryError::RecoveryInProgress.into());
        }
        (self.check_config)(&config)?;
        host.store(&ctx.address, &slot(&account, b"config"), &config)?;
        info!(module = self.name, %account, threshold = config.threshold, "recovery config updated");
        Ok(())
    }
    
    /// Anyone may submit guardian approvals; only the signatures matter.
    pub fn start_recovery(
        &self,
        host: &mut Host,
        ctx: &CallContext,
        approvals: &[GuardianData],
        account: Address,
        new_owner: &[u8],
    ) -> Result<()> {
        let module = ctx.address;
        let config = self
            .config(host, &module, &account)?
            .ok_or(RecoveryError::NotInitialized)?;
        if self.pending(host, &module, &account)?.is_some() {
            return Err(RecoveryError::RecoveryInProgress.into());
        }
        if new_owner.len() != R1_KEY_LENGTH {
            return Err(AccountError::InvalidKeyLength {
                expected: R1_KEY_LENGTH,
                actual: new_owner.len(),
            });
        }
        
        let digest = self.digest(host, &module, &account, new_owner)?;
        let mut approved = HashSet::new();
        for approval in approvals {
            let guardian = Address::from(approval.guardian);
            if !config.guardians.contains(&guardian) {
                return Err(RecoveryError::UnknownGuardian(guardian).into());
            }
            if !approved.insert(guardian) {
                return Err(RecoveryError::DuplicateGuardian(guardian).into());
            }
            if !self.verify_guardian(host, module, guardian, &digest, &approval.signature)? {
                warn!(module = self.name, %account, %guardian, "guardian signature rejected");
                return Err(RecoveryError::InvalidGuardianSignature(guardian).into());
            }
        }
        let got = approved.len() as u64;
        if got < config.threshold {
            return Err(RecoveryError::InsufficientApprovals {
                required: config.threshold,
                got,
            }
            .into());
        }
        
        let nonce = self.nonce(host, &module, &account)?;
        host.store(&module, &slot(&account, b"nonce"), &(nonce + 1))?;
        let execute_after = host.timestamp().saturating_add(config.timelock);
        let pending = PendingRecovery {
            new_owner: new_owner.to_vec(),
            execute_after,
        };
        host.store(&module, &slot(&account, b"pending"), &pending)?;
        
        info!(module = self.name, %account, approvals = got, execute_after, "recovery started");
        host.emit(Event::RecoveryStarted {
            module,
            account,
            new_owner: Bytes::from_slice(new_owner),
            execute_after,
        })
    }
    
    /// Cancel the caller's pending recovery.
    pub fn stop_recovery(&self, host: &mut Host, ctx: &CallContext) -> Result<()> {
        let (module, account) = (ctx.address, ctx.caller);
        if self.pending(host, &module, &account)?.is_none() {
            return Err(RecoveryError::NoRecoveryInProgress.into());
        }
        host.clear(&module, &slot(&account, b"pending"))?;
        info!(module = self.name, %account, "recovery stopped");
        host.emit(Event::RecoveryStopped { module, account })
    }
    
    /// Rotate `account`'s owners once the timelock has passed.
    pub fn execute_recovery(&self, host: &mut Host, ctx: &CallContext, account: Address) -> Result<()> {
        let module = ctx.address;
        let pending = self
            .pending(host, &module, &account)?
            .ok_or(RecoveryError::NoRecoveryInProgress)?;
        if host.timestamp() < pending.execute_after {
            return Err(RecoveryError::TimelockNotPassed.into());
        }
        host.clear(&module, &slot(&account, b"pending"))?;
        
        let call = IAccount::resetOwnersCall {
            pubKey: pending.new_owner.into(),
        };
        host.call(module, account, U256::zero(), &call.abi_encode())?;
        
        info!(module = self.name, %account, "recovery executed");
        host.emit(Event::RecoveryExecuted { module, account })
    }
    
    /// EOA guardians sign the digest with K1; smart-account guardians answer
    /// EIP-1271 `isValidSignature`.
    fn verify_guardian(
        &self,
        host: &mut Host,
        module: Address,
        guardian: Address,
        digest: &H256,
        signature: &[u8],
    ) -> Result<bool> {
        if host.is_account(&guardian) {
            let call = IAccount::isValidSignatureCall {
                hash: digest.to_alloy(),
                signature: signature.to_vec().into(),
            };
            let output = match host.call(module, guardian, U256::zero(), &call.abi_encode()) {
                Ok(output) => output,
                Err(AccountError::Decoding(_)) => return Ok(false),
                Err(err) => return Err(err),
            };
            let magic = IAccount::isValidSignatureCall::abi_decode_returns(&output, true)?.magicValue;
            debug!(%guardian, "guardian checked through EIP-1271");
            return Ok(magic.0 == EIP1271_MAGIC_VALUE);
        }
        
        let recovered = K1Signature::from_bytes(signature)
            .and_then(|sig| recover_address(digest, &sig))
            .ok();
        Ok(recovered == Some(guardian))
    }
    
    pub fn dispatch(&self, host: &mut Host, ctx: &CallContext, data: &[u8]) -> Result<Bytes> {
        use IRecoveryModule::IRecoveryModuleCalls as Calls;
        match Calls::abi_decode(data, true)? {
            Calls::updateConfig(c) => self.update_config(host, ctx, RecoveryConfig::from_sol(c.config))?,
            Calls::startRecovery(c) => self.start_recovery(
                host,
                ctx,
                &c.guardianData,
                c.recoveringAddress.into(),
                &c.newOwner,
            )?,
            Calls::stopRecovery(_) => self.stop_recovery(host, ctx)?,
            Calls::executeRecovery(c) => self.execute_recovery(host, ctx, c.recoveringAddress.into())?,
        }
        Ok(Bytes::new())
    }
}

/// Calldata for `startRecovery`.
pub fn start_recovery_calldata(approvals: Vec<GuardianData>, account: Address, new_owner: &[u8]) -> Vec<u8> {
    IRecoveryModule::startRecoveryCall {
        guardianData: approvals,
        recoveringAddress: account.into(),
        newOwner: new_owner.to_vec().into(),
    }
    .abi_encode()
}

/// Calldata for `executeRecovery`.
pub fn execute_recovery_calldata(account: Address) -> Vec<u8> {
    IRecoveryModule::executeRecoveryCall {
        recoveringAddress: account.into(),
    }
    .abi_encode()
}

/// Calldata for `stopRecovery`.
pub fn stop_recovery_calldata() -> Vec<u8> {
    IRecoveryModule::stopRecoveryCall {}.abi_encode()
}

/// Calldata for `updateConfig`.
pub fn update_config_calldata(config: &RecoveryConfig) -> Vec<u8> {
    IRecoveryModule::updateConfigCall { config: config.to_sol() }.abi_encode()
}
