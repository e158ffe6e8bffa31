//! Registry managers. Each mutating entry point takes the call context and
//! authorizes the caller before touching state.

pub mod hook;
pub mod module;
pub mod owner;
pub mod upgrade;
pub mod validator;

pub use hook::{context_key, HookManager};
pub use module::ModuleManager;
pub use owner::{OwnerManager, R1_KEY_LENGTH};
pub use upgrade::UpgradeManager;
pub use validator::ValidatorManager;
