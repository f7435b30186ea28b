//! Performance benchmarks for the annotation pipeline
//!
//! Run with: cargo bench

#![allow(clippy::unwrap_used)] // Unwrapping is acceptable in benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use closurize_core::{annotate_source, externs_source, Options};

// ============================================================================
// Benchmark Fixtures
// ============================================================================

const SMALL_TS: &str = "\
interface Point { x: number; y: number; }
class Vector implements Point {
    constructor(public x: number, public y: number) {}
    length(): number { return Math.sqrt(this.x * this.x + this.y * this.y); }
}
export type Scalar = number | string;
let origin: Vector | null = null;
const unit = origin!;
";

const SMALL_DTS: &str = "\
declare namespace geometry {
    interface Point { x: number; y: number; }
    function distance(a: Point, b: Point): number;
    function distance(a: number, b: number): number;
}
declare module \"geo-lib/core\" { let version: string; }
";

// Generate large file for stress testing
fn generate_large_typescript(num_classes: usize) -> String {
    let mut result = String::with_capacity(num_classes * 160);
    for i in 0..num_classes {
        result.push_str(&format!(
            "export class Widget{i} {{\n    constructor(public id: number, private label: string) {{}}\n    describe(): string {{ return this.label; }}\n}}\n\n",
        ));
    }
    result
}

// ============================================================================
// Annotation Benchmarks
// ============================================================================

fn bench_annotate(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotate");
    let host = Options::new();

    group.bench_function("typescript_small", |b| {
        b.iter(|| annotate_source("bench.ts", black_box(SMALL_TS), &host).unwrap())
    });

    group.finish();
}

// ============================================================================
// Externs Benchmarks
// ============================================================================

fn bench_externs(c: &mut Criterion) {
    let mut group = c.benchmark_group("externs");
    let host = Options::new();

    group.bench_function("declaration_small", |b| {
        b.iter(|| externs_source("bench.d.ts", black_box(SMALL_DTS), &host).unwrap())
    });

    group.finish();
}

// ============================================================================
// Scaling Benchmarks (File Size)
// ============================================================================

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let host = Options::new();

    for size in [10, 50, 100, 500] {
        let large_ts = generate_large_typescript(size);

        group.bench_with_input(BenchmarkId::new("classes", size), &large_ts, |b, input| {
            b.iter(|| annotate_source("bench.ts", black_box(input), &host).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_annotate, bench_externs, bench_scaling);
criterion_main!(benches);
