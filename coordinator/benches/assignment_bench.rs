use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rapid_coordinator::CommitteeAssigner;
use rapid_types::PublicKey;

fn registered(n: usize) -> Vec<(PublicKey, SocketAddr)> {
    (0..n)
        .map(|i| {
            let mut key = [0u8; 32];
            key[..8].copy_from_slice(&(i as u64).to_le_bytes());
            let port = 9000 + (i % 50_000) as u16;
            (PublicKey(key), SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port))
        })
        .collect()
}

fn assign_bench(c: &mut Criterion) {
    let assigner = CommitteeAssigner::new(16, 3, 2).unwrap();
    let nodes = registered(1024);

    c.bench_function("assign_1024_nodes_16_committees", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            assigner.assign(black_box(nodes.clone()), &mut rng).unwrap()
        })
    });
}

criterion_group!(benches, assign_bench);
criterion_main!(benches);
