//! Native Bridge Benchmarks
//!
//! This module benchmarks the hot paths of the native bridge:
//! - Structural cache lookups after first population
//! - Field reads, writes and method calls through the wrapper
//! - Marshalling of flat and nested structs

use aria_pybind::{host_object, HostData, NativeObject, PyValue, StructCache};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

#[derive(Debug, Default, Clone)]
struct Point {
    x: i64,
    y: i64,
    label: String,
}

impl Point {
    fn method_translate(&mut self, dx: i64, dy: i64) -> i64 {
        self.x += dx;
        self.y += dy;
        self.x + self.y
    }
}

host_object! {
    Point {
        fields { x: i64, y: i64, label: String }
        methods { fn method_translate(dx: i64, dy: i64) -> i64; }
    }
}

#[derive(Debug, Default, Clone)]
struct Path {
    name: String,
    points: Vec<Point>,
}

host_object! {
    Path {
        fields { name: String, points: Vec<Point> }
    }
}

fn path(len: usize) -> Path {
    Path {
        name: "bench".into(),
        points: (0..len as i64)
            .map(|i| Point {
                x: i,
                y: -i,
                label: format!("p{i}"),
            })
            .collect(),
    }
}

// ============================================================================
// Structural Cache Benchmarks
// ============================================================================

fn bench_cache_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("struct_cache");

    let cache = StructCache::new();
    cache.table::<Point>();
    group.bench_function("warm_lookup", |b| {
        b.iter(|| black_box(cache.table::<Point>()))
    });

    group.bench_function("cold_extract", |b| {
        b.iter(|| {
            let cache = StructCache::new();
            black_box(cache.describe::<Point>())
        })
    });

    group.finish();
}

// ============================================================================
// Wrapper Benchmarks
// ============================================================================

fn bench_wrapper(c: &mut Criterion) {
    let mut group = c.benchmark_group("native_object");

    let obj = NativeObject::new(Point::default());
    group.bench_function("get", |b| b.iter(|| black_box(obj.get_object("x"))));
    group.bench_function("set", |b| {
        b.iter(|| obj.set("y", black_box(7i64).to_host()))
    });
    group.bench_function("call", |b| {
        b.iter(|| obj.call("translate", vec![1i64.to_host(), black_box(-1i64).to_host()]))
    });

    let native = NativeObject::new(Point::default()).into_object();
    let native = native.as_native().cloned();
    if let Some(native) = native {
        group.bench_function("callattr", |b| {
            b.iter(|| native.callattr("translate", &[PyValue::Int(1), black_box(PyValue::Int(2))]))
        });
    }

    group.finish();
}

// ============================================================================
// Marshalling Benchmarks
// ============================================================================

fn bench_marshalling(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshalling");

    for len in [1usize, 16, 256] {
        let value = path(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("to_object", len), &value, |b, value| {
            b.iter(|| black_box(aria_pybind::to_object(black_box(value))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cache_lookup, bench_wrapper, bench_marshalling);
criterion_main!(benches);
