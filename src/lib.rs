// Core modules
pub mod bootstrap;
pub mod config;

// Re-export commonly used types
pub use bootstrap::{Bootstrap, BootstrapAccount, BootstrapConfig, BootstrapPaymaster, BootstrapRecovery};
pub use config::{AccountConfig, ChainConfig, Config, LogConfig, RecoveryDefaults};

// Re-export crate modules
pub use smartwallet_account_abstraction as account_abstraction;
pub use smartwallet_core as core;
pub use smartwallet_crypto as crypto;
pub use smartwallet_storage as storage;
pub use smartwallet_types as types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get client version string
pub fn client_version() -> String {
    format!("smartwallet/v{}/rust", VERSION)
}
