//! Benchmark: cell write propagation and island hydration

use archipelago_core::dom::{Document, Node, Template};
use archipelago_core::islands::{Hydrator, RegisterOptions, Registry};
use archipelago_core::reactive::{cell, derive, track};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Value;

fn benchmark_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for subscribers in [1usize, 16, 256] {
        let source = cell(0u64);
        let computations: Vec<_> = (0..subscribers)
            .map(|_| {
                let reader = source.clone();
                track(move || {
                    black_box(reader.get());
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                let mut next = 0u64;
                b.iter(|| {
                    next += 1;
                    source.set(next);
                });
            },
        );

        drop(computations);
    }

    group.finish();
}

fn benchmark_derived_chain(c: &mut Criterion) {
    let source = cell(0u64);
    let reader = source.clone();
    let mut tail = derive(move || reader.get() + 1);
    for _ in 0..32 {
        let previous = tail.clone();
        tail = derive(move || previous.get() + 1);
    }

    c.bench_function("derived_chain_32", |b| {
        let mut next = 0u64;
        b.iter(|| {
            next += 1;
            source.set(next);
            black_box(tail.peek());
        });
    });
}

fn benchmark_hydration(c: &mut Criterion) {
    c.bench_function("hydrate_100_islands", |b| {
        b.iter_with_setup(
            || {
                let mut registry = Registry::new();
                registry
                    .register(
                        "counter",
                        |props: Value| {
                            let count = cell(props["start"].as_i64().unwrap_or(0));
                            move || Template::new().markup("<p>").text(count.get()).markup("</p>")
                        },
                        RegisterOptions::new(),
                    )
                    .expect("valid name");

                let root = Node::element("body");
                for start in 0..100 {
                    root.append_child(
                        Node::element("div")
                            .with_attribute("data-island", "")
                            .with_attribute("data-component", "counter")
                            .with_attribute("data-props", format!(r#"{{"start": {start}}}"#)),
                    );
                }
                Hydrator::new(Document::with_root(root), registry)
            },
            |hydrator| black_box(hydrator.hydrate_now(None)),
        );
    });
}

criterion_group!(
    benches,
    benchmark_fan_out,
    benchmark_derived_chain,
    benchmark_hydration
);
criterion_main!(benches);
