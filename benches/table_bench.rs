use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use quadkv::Table;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (Table, Vec<String>) {
    let mut t = Table::new(32).unwrap();
    let keys: Vec<String> = lcg(seed).take(n).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        t.put(k, &i.to_string()).unwrap();
    }
    (t, keys)
}

fn bench_put_fresh_100k(c: &mut Criterion) {
    c.bench_function("table::put_fresh_100k", |b| {
        b.iter_batched(
            || Table::new(32).unwrap(),
            |mut t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    t.put(&key(x), &i.to_string()).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_put_presized_100k(c: &mut Criterion) {
    c.bench_function("table::put_presized_100k", |b| {
        b.iter_batched(
            || Table::new(1 << 18).unwrap(),
            |mut t| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    t.put(&key(x), &i.to_string()).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_10k(c: &mut Criterion) {
    c.bench_function("table::find_hit_10k_on_100k", |b| {
        let (t, keys) = filled(7, 100_000);
        // Precompute 10k random query keys using LCG
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(t.find(k));
            }
        })
    });
}

fn bench_find_miss_10k(c: &mut Criterion) {
    c.bench_function("table::find_miss_10k_on_100k", |b| {
        let (t, _) = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap());
                black_box(t.find(&k));
            }
        })
    });
}

fn bench_delete_random_10k(c: &mut Criterion) {
    c.bench_function("table::delete_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let (t, keys) = filled(5, 110_000);
                let n = keys.len();
                let mut sel = std::collections::HashSet::with_capacity(10_000);
                let mut s = 0x9e3779b97f4a7c15u64;
                while sel.len() < 10_000 {
                    s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                    sel.insert((s as usize) % n);
                }
                let to_delete: Vec<String> = sel.into_iter().map(|i| keys[i].clone()).collect();
                (t, to_delete)
            },
            |(mut t, to_delete)| {
                for k in &to_delete {
                    black_box(t.delete(k));
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_snapshot_100k(c: &mut Criterion) {
    let (t, _) = filled(13, 100_000);
    let mut buf = Vec::new();
    t.encode(&mut buf).unwrap();

    c.bench_function("table::encode_100k", |b| {
        let mut out = Vec::with_capacity(buf.len());
        b.iter(|| {
            out.clear();
            black_box(t.encode(&mut out).unwrap())
        })
    });

    c.bench_function("table::decode_100k", |b| {
        b.iter(|| black_box(Table::decode(&mut buf.as_slice()).unwrap()))
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_put;
    config = bench_config();
    targets = bench_put_fresh_100k, bench_put_presized_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_find_hit_10k,
              bench_find_miss_10k,
              bench_delete_random_10k,
              bench_snapshot_100k
}
criterion_main!(benches_put, benches_ops);
