use std::path::Path;
use std::sync::Arc;
use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use smartwallet_account_abstraction::{
    CloudRecoveryModule, EoaValidator, GaslessPaymaster, Host, RecoveryConfig,
    SocialRecoveryModule, TeeValidator,
};
use smartwallet_crypto::R1SigningKey;
use smartwallet_types::{decode_hex, Address, Bytes, U256};
use tracing::info;

use crate::config::Config;

/// Initial world: system contracts, accounts and paymasters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BootstrapConfig {
    /// Where the social recovery module is deployed
    pub social_recovery: Address,
    /// Where the cloud recovery module is deployed
    pub cloud_recovery: Address,
    /// Accounts to deploy
    pub accounts: Vec<BootstrapAccount>,
    /// Gasless paymasters to deploy
    pub paymasters: Vec<BootstrapPaymaster>,
}

/// Pre-deployed account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapAccount {
    pub address: Address,
    /// Hex R1 public key; the bootstrap signer's key when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r1_owner: Option<String>,
    /// Balance, decimal or `0x` hex
    #[serde(default)]
    pub balance: String,
    #[serde(default)]
    pub k1_owners: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_recovery: Option<BootstrapRecovery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_recovery: Option<BootstrapRecovery>,
}

/// Guardian setup of a recovery module installed at bootstrap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRecovery {
    pub threshold: u64,
    pub guardians: Vec<Address>,
    /// Seconds; the configured recovery default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timelock: Option<u64>,
}

impl BootstrapRecovery {
    pub fn to_config(&self, default_timelock: u64) -> RecoveryConfig {
        RecoveryConfig::new(
            self.timelock.unwrap_or(default_timelock),
            self.threshold,
            self.guardians.clone(),
        )
    }
}

/// Pre-deployed gasless paymaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapPaymaster {
    pub address: Address,
    /// Sponsored transactions per account
    pub limit: u64,
    #[serde(default)]
    pub balance: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            social_recovery: Address::from_low_u64_be(0x3001),
            cloud_recovery: Address::from_low_u64_be(0x3002),
            accounts: vec![BootstrapAccount {
                address: Address::from_low_u64_be(0xa11ce),
                r1_owner: None,
                balance: "1000000000000000000".to_string(), // 1 ether
                k1_owners: vec![],
                social_recovery: None,
                cloud_recovery: None,
            }],
            paymasters: vec![],
        }
    }
}

/// World builder
pub struct Bootstrap {
    config: BootstrapConfig,
}

impl Bootstrap {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }
    
    /// Load bootstrap configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context("Failed to read bootstrap file")?;
        
        Self::from_json(&content)
    }
    
    /// Load bootstrap configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BootstrapConfig = serde_json::from_str(json)
            .context("Failed to parse bootstrap configuration")?;
        
        Ok(Self { config })
    }
    
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }
    
    /// Build the in-memory world. Accounts without an explicit R1 owner are
    /// owned by `signer`.
    pub fn build(&self, config: &Config, signer: &R1SigningKey) -> Result<Host> {
        let mut host = Host::new(config.host_config());
        
        host.deploy_contract(config.account.r1_validator, Arc::new(TeeValidator));
        host.deploy_contract(config.account.k1_validator, Arc::new(EoaValidator));
        host.register_implementation(config.account.implementation, config.account.schema_version);
        host.deploy_contract(self.config.social_recovery, Arc::new(SocialRecoveryModule));
        host.deploy_contract(self.config.cloud_recovery, Arc::new(CloudRecoveryModule));
        
        for paymaster in &self.config.paymasters {
            host.deploy_contract(paymaster.address, Arc::new(GaslessPaymaster::new(paymaster.limit)));
            host.set_balance(paymaster.address, parse_u256(&paymaster.balance)?)?;
            info!(address = %paymaster.address, limit = paymaster.limit, "paymaster deployed");
        }
        
        for account in &self.config.accounts {
            self.deploy_account(&mut host, config, signer, account)
                .with_context(|| format!("Failed to deploy account {:x}", account.address))?;
        }
        
        Ok(host)
    }
    
    fn deploy_account(
        &self,
        host: &mut Host,
        config: &Config,
        signer: &R1SigningKey,
        account: &BootstrapAccount,
    ) -> Result<()> {
        let r1_owner = match &account.r1_owner {
            Some(key) => decode_hex(key).context("Failed to parse R1 owner")?,
            None => signer.public_key().to_vec(),
        };
        
        let mut modules = Vec::new();
        if let Some(recovery) = &account.social_recovery {
            let recovery = recovery.to_config(config.recovery.social_timelock);
            modules.push(module_payload(self.config.social_recovery, &recovery));
        }
        if let Some(recovery) = &account.cloud_recovery {
            let recovery = recovery.to_config(config.recovery.cloud_timelock);
            modules.push(module_payload(self.config.cloud_recovery, &recovery));
        }
        
        host.deploy_account(
            account.address,
            config.account.implementation,
            &r1_owner,
            config.account.r1_validator,
            &modules,
        )?;
        host.set_balance(account.address, parse_u256(&account.balance)?)?;
        
        if !account.k1_owners.is_empty() {
            seed_k1_owners(host, config, account)?;
        }
        
        info!(address = %account.address, modules = modules.len(), "account bootstrapped");
        Ok(())
    }
}

/// K1 owners are added the way the account itself would: through a
/// self-call, then the default K1 validator is enabled.
fn seed_k1_owners(host: &mut Host, config: &Config, account: &BootstrapAccount) -> Result<()> {
    use smartwallet_account_abstraction::{CallContext, Keyspace, OwnerManager, ValidatorManager};
    
    let ctx = CallContext::plain(account.address, account.address);
    for owner in &account.k1_owners {
        OwnerManager::add_owner(host, &ctx, Keyspace::K1, owner.as_bytes())?;
    }
    ValidatorManager::add_validator(host, &ctx, Keyspace::K1, config.account.k1_validator)?;
    Ok(())
}

fn module_payload(module: Address, config: &RecoveryConfig) -> Bytes {
    let mut payload = module.as_bytes().to_vec();
    payload.extend_from_slice(&config.encode());
    Bytes::from_vec(payload)
}

fn parse_u256(s: &str) -> Result<U256> {
    if s.is_empty() {
        Ok(U256::zero())
    } else if let Some(hex) = s.strip_prefix("0x") {
        U256::from_str_radix(hex, 16)
            .context("Failed to parse hex U256")
    } else {
        U256::from_dec_str(s)
            .context("Failed to parse U256")
    }
}
