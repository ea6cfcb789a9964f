// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Benchmark sample dispatch overhead
//!
//! Measures classify-and-apply cost per sample kind and for unknown names.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use loadscope_metrics::{InstrumentRegistry, RegistryConfig, Sample};
use std::hint::black_box;

fn samples() -> Vec<Sample> {
    (0..10_000)
        .map(|i| match i % 4 {
            0 => Sample::counter("http_reqs", 1.0),
            1 => Sample::gauge("vus", f64::from(i % 50)),
            2 => Sample::rate("checks", f64::from(i % 2)),
            _ => Sample::trend("http_req_duration", f64::from(i % 500)),
        })
        .collect()
}

fn bench_handle_sample(c: &mut Criterion) {
    let registry = InstrumentRegistry::new(RegistryConfig::default()).expect("registry");
    let batch = samples();

    let mut group = c.benchmark_group("handle_sample");
    group.throughput(Throughput::Elements(batch.len() as u64));

    group.bench_function("mixed_batch", |b| {
        b.iter(|| {
            for sample in &batch {
                registry.handle_sample(black_box(sample));
            }
        })
    });

    let untracked: Vec<_> = (0..10_000)
        .map(|i| Sample::counter("custom_metric", f64::from(i)))
        .collect();
    group.bench_function("untracked_batch", |b| {
        b.iter(|| {
            for sample in &untracked {
                registry.handle_sample(black_box(sample));
            }
        })
    });

    group.finish();
}

fn bench_exposition(c: &mut Criterion) {
    let registry = InstrumentRegistry::new(RegistryConfig::default()).expect("registry");
    for sample in samples() {
        registry.handle_sample(&sample);
    }
    let handler = registry.scrape_handler();

    c.bench_function("exposition", |b| {
        b.iter(|| black_box(handler.exposition().expect("encode")))
    });
}

criterion_group!(benches, bench_handle_sample, bench_exposition);
criterion_main!(benches);
