use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Result, Context};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use smartwallet_account_abstraction::HostConfig;
use smartwallet_types::Address;

const ENV_PREFIX: &str = "SMARTWALLET_";

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chain parameters and system contract addresses
    pub chain: ChainConfig,
    /// Per-account limits and default validators
    pub account: AccountConfig,
    /// Recovery module defaults
    pub recovery: RecoveryDefaults,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain ID bound into every transaction digest
    pub chain_id: u64,
    /// Bootloader system address
    pub bootloader: Address,
    /// Batch caller system address
    pub batch_caller: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Maximum hooks of each kind per account
    pub max_hooks: usize,
    /// Address the TEE (R1) validator is deployed at
    pub r1_validator: Address,
    /// Address the EOA (K1) validator is deployed at
    pub k1_validator: Address,
    /// Address of the account implementation
    pub implementation: Address,
    /// Storage schema version of the implementation
    pub schema_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryDefaults {
    /// Social recovery timelock in seconds
    pub social_timelock: u64,
    /// Cloud recovery timelock in seconds
    pub cloud_timelock: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,
    /// Enable JSON logging
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            account: AccountConfig::default(),
            recovery: RecoveryDefaults::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        let host = HostConfig::default();
        Self {
            chain_id: host.chain_id,
            bootloader: host.bootloader,
            batch_caller: host.batch_caller,
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            max_hooks: HostConfig::default().max_hooks,
            r1_validator: Address::from_low_u64_be(0x1001),
            k1_validator: Address::from_low_u64_be(0x1002),
            implementation: Address::from_low_u64_be(0x2001),
            schema_version: 1,
        }
    }
}

impl Default for RecoveryDefaults {
    fn default() -> Self {
        Self {
            social_timelock: 2 * 24 * 3600, // 2 days
            cloud_timelock: 24 * 3600, // 1 day
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context("Failed to read configuration file")?;
        
        let config: Config = toml::from_str(&content)
            .context("Failed to parse configuration")?;
        
        config.validate()?;
        
        Ok(config)
    }
    
    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;
        
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .context("Failed to create configuration directory")?;
            }
        }
        
        fs::write(path, content)
            .context("Failed to write configuration file")?;
        
        Ok(())
    }
    
    /// Apply `SMARTWALLET_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(std::env::vars())
    }
    
    /// Apply `SMARTWALLET_*` overrides from `vars`; other names are ignored
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let invalid = || format!("Invalid value for {}: {}", name, value);
            match key {
                "CHAIN_ID" => self.chain.chain_id = value.parse().with_context(invalid)?,
                "MAX_HOOKS" => self.account.max_hooks = value.parse().with_context(invalid)?,
                "SOCIAL_TIMELOCK" => self.recovery.social_timelock = value.parse().with_context(invalid)?,
                "CLOUD_TIMELOCK" => self.recovery.cloud_timelock = value.parse().with_context(invalid)?,
                "LOG_LEVEL" => self.log.level = value.clone(),
                "LOG_JSON" => self.log.json = value.parse().with_context(invalid)?,
                _ => {}
            }
        }
        self.validate()
    }
    
    /// Per-user default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "smartwallet", "smartwallet")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
    
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chain.chain_id == 0 {
            anyhow::bail!("chain_id must be greater than 0");
        }
        
        if self.chain.bootloader.is_zero() || self.chain.batch_caller.is_zero() {
            anyhow::bail!("System contract addresses must be non-zero");
        }
        
        if self.chain.bootloader == self.chain.batch_caller {
            anyhow::bail!("Bootloader and batch caller must differ");
        }
        
        if self.account.max_hooks == 0 {
            anyhow::bail!("max_hooks must be greater than 0");
        }
        
        if self.account.r1_validator.is_zero() || self.account.implementation.is_zero() {
            anyhow::bail!("Default validator and implementation addresses must be non-zero");
        }
        
        Ok(())
    }
    
    /// Get configuration for specific network
    pub fn for_network(network: &str) -> Result<Self> {
        let mut config = Config::default();
        
        match network.to_lowercase().as_str() {
            "mainnet" | "main" => {
                config.chain.chain_id = 324;
            }
            "sepolia" => {
                config.chain.chain_id = 300;
                config.recovery.social_timelock = 3600;
                config.recovery.cloud_timelock = 3600;
            }
            "local" | "dev" => {
                config.chain.chain_id = 270;
                config.recovery.social_timelock = 0;
                config.recovery.cloud_timelock = 0;
                config.log.level = "debug".to_string();
            }
            _ => anyhow::bail!("Unknown network: {}", network),
        }
        
        Ok(config)
    }
    
    /// Host parameters for the engine
    pub fn host_config(&self) -> HostConfig {
        HostConfig {
            chain_id: self.chain.chain_id,
            bootloader: self.chain.bootloader,
            batch_caller: self.chain.batch_caller,
            max_hooks: self.account.max_hooks,
        }
    }
}
