//! wgpu backend tests. Each test returns early when no adapter is present.
#![cfg(feature = "wgpu")]

use std::sync::Arc;

use rfx_core::{BlendTransform, Canvas, FilterConfig, Surface};
use rfx_filters::backend::wgpu_backend::COPY_PROGRAM_KEY;
use rfx_filters::backend::{BackendKind, CopyStrategy, FilterBackend, WgpuBackend};
use rfx_filters::filters::{
    BlendImage, BlendImageMode, BlendSource, Blur, Brightness, Composed, Contrast, Convolute, Grayscale, Invert,
    Resize, ResizeType,
};
use rfx_filters::{Filter, FilterError};

fn gpu() -> Option<WgpuBackend> {
    if !WgpuBackend::is_available() {
        eprintln!("no wgpu adapter, skipping");
        return None;
    }
    WgpuBackend::new(&FilterConfig { texture_size: 256, ..Default::default() }).ok()
}

fn gradient(w: u32, h: u32) -> Surface {
    let mut s = Surface::new(w, h);
    for y in 0..h {
        for x in 0..w {
            s.set_pixel(x, y, [(x * 255 / w) as u8, (y * 255 / h) as u8, 128, 255]);
        }
    }
    s
}

fn run_both(filters: &[&dyn Filter], source: &Surface) -> Option<(Surface, Surface)> {
    let mut gpu = gpu()?;
    let (w, h) = source.dimensions();
    let mut a = Canvas::new(w, h);
    gpu.apply_filters(filters, source, w, h, &mut a, None).unwrap();
    let mut b = Canvas::new(w, h);
    FilterBackend::with_kind(BackendKind::Cpu, &FilterConfig::default())
        .apply_filters(filters, source, w, h, &mut b, None)
        .unwrap();
    Some((a.into_surface()?, b.into_surface()?))
}

fn assert_close(a: &Surface, b: &Surface, tolerance: u8) {
    assert_eq!(a.dimensions(), b.dimensions());
    for (i, (x, y)) in a.data().iter().zip(b.data()).enumerate() {
        assert!(x.abs_diff(*y) <= tolerance, "byte {i}: gpu {x} vs cpu {y}");
    }
}

#[test]
fn test_per_pixel_filters_match_cpu() {
    let source = gradient(32, 16);
    let chain: [&dyn Filter; 3] = [&Brightness::new(0.1), &Contrast::new(0.2), &Grayscale::default()];
    if let Some((gpu, cpu)) = run_both(&chain, &source) {
        assert_close(&gpu, &cpu, 2);
    }
}

#[test]
fn test_invert_and_convolution_match_cpu() {
    let source = gradient(24, 24);
    let sharpen = Convolute::new(vec![0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0], true).unwrap();
    if let Some((gpu, cpu)) = run_both(&[&Invert::new(), &sharpen], &source) {
        assert_close(&gpu, &cpu, 3);
    }
}

#[test]
fn test_composed_shares_pass_budget() {
    let source = gradient(16, 16);
    let composed = Composed::new(vec![Box::new(Blur::new(0.1)), Box::new(Brightness::new(0.05))]);
    if let Some((gpu, cpu)) = run_both(&[&composed, &Invert::new()], &source) {
        assert_close(&gpu, &cpu, 6);
    }
}

#[test]
fn test_resize_output_size() {
    let Some(mut gpu) = gpu() else { return };
    let source = gradient(40, 20);
    let mut canvas = Canvas::new(40, 20);
    let resize = Resize::new(ResizeType::Lanczos, 0.5, 0.5).unwrap();
    let out = gpu.apply_filters(&[&resize], &source, 40, 20, &mut canvas, None).unwrap().unwrap();
    assert_eq!((out.width, out.height), (20, 10));
    assert_eq!((canvas.width(), canvas.height()), (20, 10));
}

#[test]
fn test_distinct_kernels_compile_distinct_programs() {
    let Some(mut gpu) = gpu() else { return };
    let source = gradient(8, 8);
    let mut canvas = Canvas::new(8, 8);
    let a = Convolute::new(vec![0.0; 9], false).unwrap();
    let b = Convolute::new(vec![0.0; 25], false).unwrap();
    let c = Convolute::new(vec![0.0; 9], true).unwrap();
    gpu.apply_filters(&[&a, &b, &c], &source, 8, 8, &mut canvas, None).unwrap();
    for key in [a.cache_key(), b.cache_key(), c.cache_key()] {
        assert!(gpu.programs().contains(&key), "{key} not compiled");
    }
}

#[test]
fn test_texture_cache_and_eviction() {
    let Some(mut gpu) = gpu() else { return };
    let source = gradient(8, 8);
    let mut canvas = Canvas::new(8, 8);
    gpu.apply_filters(&[&Invert::new()], &source, 8, 8, &mut canvas, Some("img-1")).unwrap();
    assert!(gpu.textures().contains("img-1"));
    gpu.evict_caches_for_key("img-1");
    assert!(!gpu.textures().contains("img-1"));
}

#[test]
fn test_too_large_image_rejected() {
    let Some(mut gpu) = gpu() else { return };
    let source = Surface::new(1, 1);
    let mut canvas = Canvas::new(1, 1);
    let err = gpu.apply_filters(&[], &source, 100_000, 1, &mut canvas, None).unwrap_err();
    assert!(matches!(err, FilterError::ImageTooLarge { .. }));
}

#[test]
fn test_upscale_past_limit_rejected() {
    let Some(mut gpu) = gpu() else { return };
    let Some(limit) = gpu.max_texture_size() else { return };
    let width = limit / 2;
    let source = Surface::new(width, 1);
    let mut canvas = Canvas::new(width, 1);
    let resize = Resize::new(ResizeType::Lanczos, 4.0, 1.0).unwrap();
    let err = gpu.apply_filters(&[&resize], &source, width, 1, &mut canvas, None).unwrap_err();
    assert!(matches!(err, FilterError::ImageTooLarge { width: w, .. } if w > limit), "{err:?}");
}

fn overlay() -> BlendImage {
    let mut image = Surface::new(8, 8);
    for y in 0..8 {
        for x in 0..8 {
            image.set_pixel(x, y, [(x * 32) as u8, 200, (y * 32) as u8, 160]);
        }
    }
    let source = BlendSource::new("overlay", Arc::new(image)).with_transform(BlendTransform::placement(1.0, 1.0, 4.0, 4.0));
    BlendImage::new(source, BlendImageMode::Multiply)
}

#[test]
fn test_blend_image_matches_cpu() {
    let source = gradient(16, 16);
    let blend = overlay();
    // Invert runs after the blend with the secondary slot restored.
    if let Some((gpu, cpu)) = run_both(&[&blend, &Invert::new()], &source) {
        assert_close(&gpu, &cpu, 3);
    }
}

#[test]
fn test_blend_image_texture_cached_by_src() {
    let Some(mut gpu) = gpu() else { return };
    let source = gradient(16, 16);
    let mut canvas = Canvas::new(16, 16);
    let blend = overlay();
    gpu.apply_filters(&[&blend], &source, 16, 16, &mut canvas, None).unwrap();
    assert!(gpu.textures().contains("overlay"));
    gpu.apply_filters(&[&blend, &Brightness::new(0.1)], &source, 16, 16, &mut canvas, None).unwrap();
    assert_eq!(gpu.textures().len(), 1);
    assert!(gpu.textures().stats().hits >= 1);
}

#[test]
fn test_forced_put_image_data() {
    if !WgpuBackend::is_available() {
        return;
    }
    let config = FilterConfig { texture_size: 64, force_put_image_data: true, ..Default::default() };
    let gpu = WgpuBackend::new(&config).unwrap();
    assert_eq!(gpu.copy_strategy(), CopyStrategy::PutImageData);
    assert!(gpu.programs().is_empty());
}

#[test]
fn test_copy_program_compiled_before_benchmark() {
    let Some(gpu) = gpu() else { return };
    assert!(gpu.programs().contains(COPY_PROGRAM_KEY));
}

#[test]
fn test_dispose_drops_device() {
    let Some(mut gpu) = gpu() else { return };
    gpu.dispose();
    assert!(gpu.is_disposed());
    assert!(gpu.programs().is_empty());
    let mut canvas = Canvas::new(2, 2);
    assert!(gpu.apply_filters(&[], &Surface::new(2, 2), 2, 2, &mut canvas, None).is_err());
}
