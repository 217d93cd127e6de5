//! Criterion benchmarks for cuebuild critical paths
//!
//! Benchmarks the operations every build goes through:
//! - Projection: walking overlays into a source table
//! - Build: projection, loading and evaluation of one package

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cuebuild::build::{BuildContext, Compiler};
use cuebuild::config::BuildOptions;
use cuebuild::overlay::{project_overlays, Overlays};
use cuebuild::vfs::MemoryFs;
use std::path::Path;

const SRC: &str = "/bench-src";

// =============================================================================
// Test Data Generators
// =============================================================================

/// Generate one source file with `fields` fields
fn make_source(index: usize, fields: usize) -> String {
    let body: Vec<String> = (0..fields)
        .map(|j| format!("svc_{}: field_{}: {{ port: int & {}, name: \"svc\" }}", index, j, 8000 + j))
        .collect();
    format!("package bench\n\n{}\n", body.join("\n"))
}

/// Split `files` source files across `overlay_count` overlays mounted at the root
fn make_overlays(overlay_count: usize, files: usize, fields: usize) -> Overlays {
    let mut mounts: Vec<MemoryFs> = (0..overlay_count).map(|_| MemoryFs::new()).collect();
    for i in 0..files {
        let fs = &mut mounts[i % overlay_count];
        fs.insert_file(format!("config_{}.cue", i), make_source(i, fields));
        fs.insert_file(format!("notes_{}.md", i), "skipped");
    }
    mounts.into_iter().fold(Overlays::new(), |overlays, fs| overlays.mount(".", fs))
}

// =============================================================================
// Projection Benchmarks
// =============================================================================

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    for files in [8, 64, 256].iter() {
        let overlays = make_overlays(4, *files, 4);
        let sequential = BuildOptions::default();
        let parallel = BuildOptions::default().with_parallel_overlays(true);
        group.throughput(Throughput::Elements(*files as u64));

        group.bench_with_input(BenchmarkId::new("sequential", files), &overlays, |b, overlays| {
            b.iter(|| project_overlays(Path::new(SRC), black_box(overlays), &sequential))
        });
        group.bench_with_input(BenchmarkId::new("parallel", files), &overlays, |b, overlays| {
            b.iter(|| project_overlays(Path::new(SRC), black_box(overlays), &parallel))
        });
    }

    group.finish();
}

// =============================================================================
// Build Benchmarks
// =============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let compiler = Compiler::native();
    let ctx = BuildContext::background();

    for files in [1, 16, 64].iter() {
        let overlays = make_overlays(2, *files, 16);
        group.throughput(Throughput::Elements(*files as u64));
        group.bench_with_input(BenchmarkId::new("native", files), &overlays, |b, overlays| {
            b.iter(|| compiler.build(&ctx, SRC, black_box(overlays), &["."]))
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(benches, bench_projection, bench_build);

criterion_main!(benches);
