use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{genesis_block, Miner};
use serde_json::json;

fn bench_pow(c: &mut Criterion) {
    c.bench_function("mine_block_prime_tail", |b| {
        let genesis = genesis_block();
        let miner = Miner::new();
        let mut round = 0u64;

        b.iter(|| {
            round += 1;
            let _mined = miner
                .mine_with_clock(&genesis, json!(format!("bench-{round}")), || 1_700_000_000)
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
