use crate::Keyspace;
use serde::Serialize;
use smartwallet_types::{Address, Bytes, H256, U256};

/// Log entries appended to the host. Reverted frames drop their events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    OwnerAdded {
        account: Address,
        keyspace: Keyspace,
        key: Bytes,
    },
    OwnerRemoved {
        account: Address,
        keyspace: Keyspace,
        key: Bytes,
    },
    OwnersReset {
        account: Address,
        r1_owner: Bytes,
    },
    ValidatorAdded {
        account: Address,
        keyspace: Keyspace,
        validator: Address,
    },
    ValidatorRemoved {
        account: Address,
        keyspace: Keyspace,
        validator: Address,
    },
    ModuleAdded {
        account: Address,
        module: Address,
    },
    ModuleRemoved {
        account: Address,
        module: Address,
    },
    HookAdded {
        account: Address,
        hook: Address,
        is_validation: bool,
    },
    HookRemoved {
        account: Address,
        hook: Address,
        is_validation: bool,
    },
    Upgraded {
        account: Address,
        old_implementation: Address,
        new_implementation: Address,
    },
    FeeSponsored {
        paymaster: Address,
        account: Address,
        fee: U256,
    },
    RecoveryStarted {
        module: Address,
        account: Address,
        new_owner: Bytes,
        execute_after: u64,
    },
    RecoveryStopped {
        module: Address,
        account: Address,
    },
    RecoveryExecuted {
        module: Address,
        account: Address,
    },
    TransactionExecuted {
        account: Address,
        tx_hash: H256,
        nonce: u64,
    },
}
