use criterion::{black_box, criterion_group, criterion_main, Criterion};
use idlist::{Identifier, IdentifierList};
use rand::seq::SliceRandom;
use rand::thread_rng;

fn build_sequential(n: u64) -> IdentifierList {
    let start = Identifier::new("bench", 0).unwrap();
    IdentifierList::empty().insert_after(None, &start, n).unwrap()
}

fn bulk_insert_benchmark(c: &mut Criterion) {
    c.bench_function("insert_after 10_000 sequential", |b| {
        b.iter(|| black_box(build_sequential(10_000)))
    });
}

fn at_benchmark(c: &mut Criterion) {
    let list = build_sequential(10_000);
    c.bench_function("at, middle of 10_000", |b| {
        b.iter(|| black_box(list.at(5_000).unwrap()))
    });
}

fn interleaved_insert_delete_benchmark(c: &mut Criterion) {
    c.bench_function("1_000 interior inserts into a 10_000 list", |b| {
        b.iter(|| {
            let mut list = build_sequential(10_000);
            for i in 0..1_000u64 {
                let anchor = list.at(i * 9).unwrap();
                let fresh = Identifier::new(format!("bench-{i}"), 0).unwrap();
                list = list.insert_after(Some(&anchor), &fresh, 1).unwrap();
            }
            black_box(list)
        })
    });
}

fn random_order_insert_benchmark(c: &mut Criterion) {
    let mut anchors: Vec<u64> = (0..999).collect();
    c.bench_function("1_000 inserts at shuffled anchors", |b| {
        b.iter(|| {
            anchors.shuffle(&mut thread_rng());
            let mut list = build_sequential(1_000);
            for &i in &anchors {
                let anchor = list.at(i).unwrap();
                let fresh = Identifier::new("shuffled", i).unwrap();
                list = list.insert_after(Some(&anchor), &fresh, 1).unwrap();
            }
            black_box(list)
        })
    });
}

criterion_group!(
    benches,
    bulk_insert_benchmark,
    at_benchmark,
    interleaved_insert_delete_benchmark,
    random_order_insert_benchmark
);
criterion_main!(benches);
