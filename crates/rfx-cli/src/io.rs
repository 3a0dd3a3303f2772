//! PNG reading and writing for [`Surface`]s.
//!
//! Input is expanded to 8-bit; gray and RGB images gain channels so every
//! surface is RGBA. Output is always 8-bit RGBA.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rfx_core::Surface;
use rfx_filters::registry::{BoxFuture, SourceLoader};
use rfx_filters::{FilterError, FilterResult};

/// Read a PNG into an RGBA surface.
pub fn read_png(path: &Path) -> Result<Surface> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().with_context(|| format!("Failed to decode: {}", path.display()))?;

    let buf_size = reader.output_buffer_size().context("cannot determine output buffer size")?;
    let mut buf = vec![0u8; buf_size];
    let info = reader.next_frame(&mut buf)?;
    let pixels = &buf[..info.buffer_size()];

    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => pixels.to_vec(),
        png::ColorType::Rgb => pixels.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
        png::ColorType::Grayscale => pixels.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::GrayscaleAlpha => pixels.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect(),
        other => bail!("unsupported PNG color type {other:?}"),
    };
    Ok(Surface::from_rgba(info.width, info.height, rgba)?)
}

/// Write an RGBA surface as an 8-bit PNG.
pub fn write_png(path: &Path, surface: &Surface) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), surface.width(), surface.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(surface.data())?;
    Ok(())
}

/// Loads blend images from PNG files, resolving relative `src` against `base`.
#[derive(Debug, Clone)]
pub struct PngSourceLoader {
    base: PathBuf,
}

impl PngSourceLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, src: &str) -> PathBuf {
        let path = Path::new(src);
        if path.is_absolute() { path.to_path_buf() } else { self.base.join(path) }
    }
}

impl SourceLoader for PngSourceLoader {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, FilterResult<Arc<Surface>>> {
        Box::pin(async move {
            let path = self.resolve(src);
            read_png(&path)
                .map(Arc::new)
                .map_err(|e| FilterError::SourceLoad { src: src.to_string(), message: format!("{e:#}") })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        let mut s = Surface::new(5, 3);
        s.set_pixel(4, 2, [1, 2, 3, 4]);
        write_png(&path, &s).unwrap();
        assert_eq!(read_png(&path).unwrap(), s);
    }

    #[test]
    fn test_loader_resolves_relative() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("m.png"), &Surface::filled(2, 2, [9, 9, 9, 9])).unwrap();
        let loader = PngSourceLoader::new(dir.path());
        let s = pollster::block_on(loader.load("m.png")).unwrap();
        assert_eq!(s.pixel(1, 1), [9, 9, 9, 9]);
        assert!(matches!(pollster::block_on(loader.load("missing.png")), Err(FilterError::SourceLoad { .. })));
    }
}
