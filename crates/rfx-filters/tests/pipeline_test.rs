//! End-to-end chains through the CPU backend.

use rfx_core::{Canvas, FilterConfig, Surface};
use rfx_filters::backend::{BackendKind, CpuBackend, FilterBackend};
use rfx_filters::filters::{
    Blur, Brightness, ColorMatrix, Composed, Contrast, Convolute, Grayscale, Invert, Resize, ResizeType,
};
use rfx_filters::{Filter, active_filters};

fn cpu() -> FilterBackend {
    FilterBackend::with_kind(BackendKind::Cpu, &FilterConfig::default())
}

fn gradient(w: u32, h: u32) -> Surface {
    let mut s = Surface::new(w, h);
    for y in 0..h {
        for x in 0..w {
            s.set_pixel(x, y, [(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 90, 255]);
        }
    }
    s
}

fn run(filters: &[&dyn Filter], source: &Surface) -> Canvas {
    let (w, h) = source.dimensions();
    let mut canvas = Canvas::new(w, h);
    let out = cpu().apply_filters(filters, source, w, h, &mut canvas, None).unwrap();
    assert!(out.is_some());
    canvas
}

#[test]
fn test_golden_brightness_and_contrast() {
    let source = Surface::filled(1, 1, [200, 100, 50, 1]);
    let canvas = run(&[&Brightness::new(0.2)], &source);
    assert_eq!(canvas.surface().unwrap().pixel(0, 0), [251, 151, 101, 1]);

    let canvas = run(&[&Contrast::new(0.2)], &source);
    assert_eq!(canvas.surface().unwrap().pixel(0, 0), [236, 86, 11, 1]);
}

#[test]
fn test_empty_chain_copies_source() {
    let source = gradient(16, 9);
    let canvas = run(&[], &source);
    assert_eq!(canvas.surface().unwrap(), &source);
}

#[test]
fn test_identity_filters_leave_pixels() {
    let source = gradient(12, 7);
    let canvas = run(&[&ColorMatrix::default(), &Convolute::default()], &source);
    assert_eq!(canvas.surface().unwrap(), &source);
}

#[test]
fn test_resize_resizes_destination() {
    let source = gradient(101, 40);
    let resize = Resize::new(ResizeType::Hermite, 0.5, 0.5).unwrap();
    let mut canvas = Canvas::new(101, 40);
    let out = cpu().apply_filters(&[&resize], &source, 101, 40, &mut canvas, None).unwrap().unwrap();
    assert_eq!((out.width, out.height), (51, 20));
    assert_eq!((canvas.width(), canvas.height()), (51, 20));
}

#[test]
fn test_every_resize_type_downscales() {
    let source = gradient(64, 64);
    for ty in [ResizeType::Bilinear, ResizeType::Hermite, ResizeType::Lanczos, ResizeType::SliceHack] {
        let resize = Resize::new(ty, 0.25, 0.5).unwrap();
        let mut canvas = Canvas::new(64, 64);
        let out = cpu().apply_filters(&[&resize], &source, 64, 64, &mut canvas, None).unwrap().unwrap();
        assert_eq!((out.width, out.height), (16, 32), "{ty:?}");
    }
}

#[test]
fn test_missing_context_is_a_no_op() {
    let source = gradient(4, 4);
    let mut canvas = Canvas::without_context(4, 4);
    let out = cpu().apply_filters(&[&Invert::new()], &source, 4, 4, &mut canvas, None).unwrap();
    assert!(out.is_none());
}

#[test]
fn test_source_scaled_to_requested_size() {
    let source = Surface::filled(8, 8, [10, 20, 30, 255]);
    let mut canvas = Canvas::new(1, 1);
    let out = cpu().apply_filters(&[], &source, 4, 2, &mut canvas, None).unwrap().unwrap();
    assert_eq!((out.width, out.height), (4, 2));
    assert_eq!(canvas.surface().unwrap().pixel(3, 1), [10, 20, 30, 255]);
}

#[test]
fn test_composed_matches_flat_chain() {
    let source = gradient(20, 10);
    let composed = Composed::new(vec![Box::new(Grayscale::default()), Box::new(Blur::new(0.1))]);
    let a = run(&[&composed], &source);
    let b = run(&[&Grayscale::default(), &Blur::new(0.1)], &source);
    assert_eq!(a.surface(), b.surface());
}

#[test]
fn test_active_filters_skips_neutral() {
    let chain: Vec<Box<dyn Filter>> =
        vec![Box::new(Brightness::new(0.0)), Box::new(Invert::new()), Box::new(Blur::new(0.0))];
    let active = active_filters(&chain);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].filter_type(), "Invert");
}

#[test]
fn test_scratch_pool_survives_runs() {
    let mut backend = CpuBackend::new();
    let source = gradient(10, 10);
    let mut canvas = Canvas::new(10, 10);
    backend.apply_filters(&[&Blur::new(0.3)], &source, 10, 10, &mut canvas).unwrap();
    assert!(backend.resources().is_allocated(rfx_filters::backend::ScratchSlot::BlurLayer1));
    backend.dispose();
    assert!(!backend.resources().is_allocated(rfx_filters::backend::ScratchSlot::BlurLayer1));
}

#[test]
fn test_zero_size_rejected() {
    let source = gradient(4, 4);
    let mut canvas = Canvas::new(4, 4);
    assert!(cpu().apply_filters(&[], &source, 0, 4, &mut canvas, None).is_err());
}
