use proptest::prelude::*;
use smartwallet_account_abstraction::{
    testing::{bool_hook_data, BoolHook, Fixture},
    AccountError, HookManager, Keyspace, OwnerManager, TeeValidator, ValidatorManager,
};
use smartwallet_types::{Address, Bytes, U256};

const POOL: usize = 4;

#[derive(Debug, Clone, Copy)]
enum Op {
    AddOwner(usize),
    RemoveOwner(usize),
    AddValidator(usize),
    RemoveValidator(usize),
    AddHook(usize),
    RemoveHook(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..POOL).prop_map(Op::AddOwner),
        (0..POOL).prop_map(Op::RemoveOwner),
        (0..POOL).prop_map(Op::AddValidator),
        (0..POOL).prop_map(Op::RemoveValidator),
        (0..POOL).prop_map(Op::AddHook),
        (0..POOL).prop_map(Op::RemoveHook),
    ]
}

/// Expected registry contents, in registration order.
struct Model {
    owners: Vec<Vec<u8>>,
    validators: Vec<Address>,
    hooks: Vec<Address>,
}

struct World {
    fx: Fixture,
    owner_keys: Vec<Vec<u8>>,
    validators: Vec<Address>,
    hooks: Vec<Address>,
}

fn world() -> World {
    let mut fx = Fixture::new();
    let mut owner_keys = vec![fx.r1_key.public_key().to_vec()];
    owner_keys.extend((1..POOL).map(|i| vec![i as u8; 64]));
    let mut validators = vec![fx.r1_validator];
    validators.extend((1..POOL).map(|_| fx.deploy(TeeValidator)));
    let hooks = (0..POOL).map(|_| fx.deploy(BoolHook)).collect();
    World {
        fx,
        owner_keys,
        validators,
        hooks,
    }
}

/// Add to an ordered model, mirroring the registry's duplicate policy.
fn model_add<T: PartialEq + Clone>(items: &mut Vec<T>, item: &T) -> bool {
    if items.contains(item) {
        return false;
    }
    items.push(item.clone());
    true
}

fn model_remove<T: PartialEq>(items: &mut Vec<T>, item: &T, keep_one: bool) -> bool {
    match items.iter().position(|i| i == item) {
        Some(_) if keep_one && items.len() == 1 => false,
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

fn apply(world: &mut World, model: &mut Model, op: Op) -> (Result<(), AccountError>, bool) {
    let ctx = world.fx.self_ctx();
    let host = &mut world.fx.host;
    match op {
        Op::AddOwner(i) => (
            OwnerManager::add_owner(host, &ctx, Keyspace::R1, &world.owner_keys[i]),
            model_add(&mut model.owners, &world.owner_keys[i]),
        ),
        Op::RemoveOwner(i) => (
            OwnerManager::remove_owner(host, &ctx, Keyspace::R1, &world.owner_keys[i]),
            model_remove(&mut model.owners, &world.owner_keys[i], true),
        ),
        Op::AddValidator(i) => (
            ValidatorManager::add_validator(host, &ctx, Keyspace::R1, world.validators[i]),
            model_add(&mut model.validators, &world.validators[i]),
        ),
        Op::RemoveValidator(i) => (
            ValidatorManager::remove_validator(host, &ctx, Keyspace::R1, world.validators[i]),
            model_remove(&mut model.validators, &world.validators[i], true),
        ),
        Op::AddHook(i) => (
            HookManager::add_hook(host, &ctx, world.hooks[i].as_bytes(), true),
            model_add(&mut model.hooks, &world.hooks[i]),
        ),
        Op::RemoveHook(i) => (
            HookManager::remove_hook(host, &ctx, world.hooks[i], true, &[]),
            model_remove(&mut model.hooks, &world.hooks[i], false),
        ),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    
    /// Registries track exactly the successful operations, in order, and
    /// never lose their last R1 owner or validator.
    #[test]
    fn registries_follow_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut world = world();
        let mut model = Model {
            owners: vec![world.owner_keys[0].clone()],
            validators: vec![world.validators[0]],
            hooks: vec![],
        };
        
        for op in ops {
            let snapshot = world.fx.host.state().clone();
            let (result, expected_ok) = apply(&mut world, &mut model, op);
            prop_assert_eq!(result.is_ok(), expected_ok, "{:?} -> {:?}", op, result);
            if result.is_err() {
                prop_assert!(world.fx.host.state() == &snapshot, "{:?} left partial state", op);
            }
            
            let account = world.fx.account;
            let host = &world.fx.host;
            let owners: Vec<Vec<u8>> = OwnerManager::list_owners(host, &account, Keyspace::R1)
                .unwrap()
                .into_iter()
                .map(Bytes::into_vec)
                .collect();
            prop_assert!(!owners.is_empty());
            prop_assert_eq!(&owners, &model.owners);
            
            let validators = ValidatorManager::list_validators(host, &account, Keyspace::R1).unwrap();
            prop_assert!(!validators.is_empty());
            prop_assert_eq!(&validators, &model.validators);
            
            prop_assert_eq!(&HookManager::list_hooks(host, &account, true).unwrap(), &model.hooks);
        }
    }
    
    /// A transaction passes validation only when it carries one hook data
    /// entry per installed validation hook.
    #[test]
    fn hook_data_arity(hooks in 0usize..4, entries in 0usize..5) {
        let mut fx = Fixture::new();
        for _ in 0..hooks {
            let hook = fx.deploy(BoolHook);
            fx.install_hook(hook, true).unwrap();
        }
        
        let tx = fx.sign(
            fx.transfer_tx(Address::from_low_u64_be(0xbeef), U256::one()),
            vec![bool_hook_data(false); entries],
        );
        let result = fx.send(&tx);
        prop_assert_eq!(result.is_ok(), hooks == entries);
        if let Err(failure) = result {
            let is_mismatch = matches!(failure.error, AccountError::HookDataLengthMismatch { .. });
            prop_assert!(is_mismatch);
        }
    }
}
