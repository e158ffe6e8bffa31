use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use smartwallet_account_abstraction::testing::{bool_hook_data, BoolHook, Fixture};
use smartwallet_account_abstraction::SmartAccount;
use smartwallet_core::{SignatureEnvelope, Transaction};
use smartwallet_crypto::{verify_r1, R1SigningKey};
use smartwallet_types::{Address, Bytes, H256, U256};

fn recipient() -> Address {
    Address::from_low_u64_be(0xbeef)
}

/// Benchmark digest construction and envelope decoding
fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");
    let fx = Fixture::new();
    let tx = fx.sign(fx.transfer_tx(recipient(), U256::one()), vec![]);
    
    group.bench_function("signing_hash", |b| {
        b.iter(|| black_box(&tx).signing_hash(270))
    });
    
    group.bench_function("envelope_decode", |b| {
        b.iter(|| SignatureEnvelope::decode(black_box(&tx.signature)))
    });
    
    group.bench_function("message_digest", |b| {
        let hash = H256::repeat_byte(7);
        b.iter(|| SmartAccount::message_digest(270, fx.account, black_box(&hash)))
    });
    
    group.finish();
}

/// Benchmark raw R1 verification
fn bench_r1_verify(c: &mut Criterion) {
    let key = R1SigningKey::random();
    let public_key = key.public_key();
    let hash = H256::repeat_byte(0x42);
    let signature = key.sign_hash(&hash).unwrap();
    
    c.bench_function("r1_verify", |b| {
        b.iter(|| verify_r1(black_box(&hash), black_box(&signature), &public_key))
    });
}

/// Benchmark the full pipeline with growing validation hook counts
fn bench_process_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_transaction");
    
    for hooks in &[0usize, 1, 4, 8] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(hooks), hooks, |b, &hooks| {
            b.iter_batched(
                || setup(hooks),
                |(mut fx, tx)| fx.send(black_box(&tx)).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }
    
    group.finish();
}

fn setup(hooks: usize) -> (Fixture, Transaction) {
    let mut fx = Fixture::new();
    for _ in 0..hooks {
        let hook = fx.deploy(BoolHook);
        fx.install_hook(hook, true).unwrap();
    }
    let hook_data: Vec<Bytes> = vec![bool_hook_data(false); hooks];
    let tx = fx.sign(fx.transfer_tx(recipient(), U256::one()), hook_data);
    (fx, tx)
}

criterion_group!(
    benches,
    bench_digest,
    bench_r1_verify,
    bench_process_transaction,
);

criterion_main!(benches);
