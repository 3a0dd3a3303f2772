//! Benchmarks for CPU filter chains.
//!
//! Run with: `cargo bench -p rfx-bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rfx_core::{Canvas, FilterConfig, Surface};
use rfx_filters::backend::{BackendKind, FilterBackend};
use rfx_filters::filters::{
    Blur, Brightness, ColorMatrixPreset, Contrast, Convolute, PresetFilter, Resize, ResizeType,
};
use rfx_filters::Filter;

fn test_image(size: u32) -> Surface {
    let mut s = Surface::new(size, size);
    for y in 0..size {
        for x in 0..size {
            s.set_pixel(x, y, [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255]);
        }
    }
    s
}

fn run_chain(backend: &mut FilterBackend, filters: &[&dyn Filter], source: &Surface, canvas: &mut Canvas) {
    let (w, h) = source.dimensions();
    backend.apply_filters(filters, source, w, h, canvas, None).ok();
}

/// Per-pixel filters.
fn bench_per_pixel(c: &mut Criterion) {
    let mut group = c.benchmark_group("per_pixel");
    let mut backend = FilterBackend::with_kind(BackendKind::Cpu, &FilterConfig::default());

    for size in [256u32, 1024] {
        let source = test_image(size);
        let mut canvas = Canvas::new(size, size);
        group.throughput(Throughput::Elements(size as u64 * size as u64));

        let brightness = Brightness::new(0.2);
        group.bench_with_input(BenchmarkId::new("brightness", size), &source, |b, s| {
            b.iter(|| run_chain(&mut backend, &[&brightness], black_box(s), &mut canvas))
        });

        let contrast = Contrast::new(0.3);
        group.bench_with_input(BenchmarkId::new("contrast", size), &source, |b, s| {
            b.iter(|| run_chain(&mut backend, &[&contrast], black_box(s), &mut canvas))
        });

        let sepia = PresetFilter::new(ColorMatrixPreset::Sepia);
        group.bench_with_input(BenchmarkId::new("sepia", size), &source, |b, s| {
            b.iter(|| run_chain(&mut backend, &[&sepia], black_box(s), &mut canvas))
        });
    }

    group.finish();
}

/// Neighbourhood and separable filters.
fn bench_spatial(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial");
    group.sample_size(20);
    let mut backend = FilterBackend::with_kind(BackendKind::Cpu, &FilterConfig::default());
    let source = test_image(512);
    let mut canvas = Canvas::new(512, 512);
    group.throughput(Throughput::Elements(512 * 512));

    let sharpen = Convolute::new(vec![0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0], false).ok();
    if let Some(sharpen) = &sharpen {
        group.bench_function("convolute_3x3", |b| b.iter(|| run_chain(&mut backend, &[sharpen], &source, &mut canvas)));
    }

    let blur = Blur::new(0.1);
    group.bench_function("blur", |b| b.iter(|| run_chain(&mut backend, &[&blur], &source, &mut canvas)));

    for ty in [ResizeType::Bilinear, ResizeType::Hermite, ResizeType::Lanczos, ResizeType::SliceHack] {
        let Ok(resize) = Resize::new(ty, 0.3, 0.3) else { continue };
        group.bench_with_input(BenchmarkId::new("resize", format!("{ty:?}")), &resize, |b, r| {
            b.iter(|| run_chain(&mut backend, &[r], &source, &mut canvas))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_per_pixel, bench_spatial);

criterion_main!(benches);
