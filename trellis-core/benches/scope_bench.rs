//! Benchmarks for scope-chain resolution and declaration throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::{Scope, Value, VarOptions};

/// Build a chain of `depth` scopes under a root that exposes `x`.
fn chain(depth: usize) -> (Scope, Scope) {
    let root = Scope::new(None);
    root.define("x", VarOptions::value(1)).unwrap();

    let mut leaf = root.clone();
    for _ in 0..depth {
        leaf = leaf.child();
    }
    (root, leaf)
}

/// Benchmark unshadowed reads falling through chains of varying depth.
fn bench_chain_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_read");

    for depth in [1, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let (_root, leaf) = chain(depth);
            b.iter(|| black_box(leaf.get("x")));
        });
    }

    group.finish();
}

/// Benchmark inherited-variable reads, which walk the ancestor chain on
/// every access.
fn bench_inherited_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("inherited_read");

    for depth in [1, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let (_root, leaf) = chain(depth);
            leaf.define("mirror", VarOptions::inherited("x")).unwrap();
            b.iter(|| black_box(leaf.get("mirror")));
        });
    }

    group.finish();
}

/// Benchmark declaration and redeclaration of value variables.
fn bench_define(c: &mut Criterion) {
    c.bench_function("redeclare_value_var", |b| {
        let scope = Scope::new(None);
        let mut i: i64 = 0;
        b.iter(|| {
            i += 1;
            scope.define("x", VarOptions::value(i)).unwrap();
        });
    });

    c.bench_function("write_value_var", |b| {
        let scope = Scope::new(None);
        scope.define("x", VarOptions::value(0)).unwrap();
        let mut i: i64 = 0;
        b.iter(|| {
            i += 1;
            scope.set("x", Value::from(i));
        });
    });
}

criterion_group!(
    benches,
    bench_chain_read,
    bench_inherited_read,
    bench_define
);
criterion_main!(benches);
