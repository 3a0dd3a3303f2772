//! RGBA8 raster surface.
//!
//! A [`Surface`] is the 2D drawing target of the pipeline: a row-major buffer
//! of straight-alpha RGBA bytes with the operations a 2D context offers the
//! filter engine (scaled draws, raw pixel read/write, resize, clear).

use rayon::prelude::*;

use crate::pixel::{CHANNELS, offset};
use crate::transform::BlendTransform;
use crate::{Error, Result};

/// Straight-alpha RGBA8 pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// Create a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        let len = byte_len(width, height);
        Self { width, height, data: vec![0; len] }
    }

    /// Create a surface filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(byte_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Wrap existing RGBA bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch { expected, actual: data.len() });
        }
        Ok(Self { width, height, data })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable RGBA bytes.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the surface, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = offset(x, y, self.width);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Overwrite pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = offset(x, y, self.width);
        self.data[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Resize the surface. Like a canvas element, this always clears.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(byte_len(width, height), 0);
    }

    /// Set every byte to zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Copy of the pixels in the `width x height` rectangle at the origin.
    ///
    /// Pixels outside the surface read as transparent.
    pub fn get_image_data(&self, width: u32, height: u32) -> Vec<u8> {
        if width == self.width && height == self.height {
            return self.data.clone();
        }
        let mut out = vec![0u8; byte_len(width, height)];
        let copy_w = width.min(self.width) as usize * CHANNELS;
        for y in 0..height.min(self.height) {
            let src = offset(0, y, self.width);
            let dst = offset(0, y, width);
            out[dst..dst + copy_w].copy_from_slice(&self.data[src..src + copy_w]);
        }
        out
    }

    /// Write raw RGBA bytes at the origin, replacing existing pixels.
    pub fn put_image_data(&mut self, data: &[u8], width: u32, height: u32) -> Result<()> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch { expected, actual: data.len() });
        }
        if width == self.width && height == self.height {
            self.data.copy_from_slice(data);
            return Ok(());
        }
        let copy_w = width.min(self.width) as usize * CHANNELS;
        for y in 0..height.min(self.height) {
            let src = offset(0, y, width);
            let dst = offset(0, y, self.width);
            self.data[dst..dst + copy_w].copy_from_slice(&data[src..src + copy_w]);
        }
        Ok(())
    }

    /// Draw `src` stretched over the `width x height` rectangle at the origin.
    ///
    /// Covered pixels are replaced; scaling uses bilinear sampling with
    /// clamped edges.
    pub fn draw_image(&mut self, src: &Surface, width: u32, height: u32) {
        self.draw_image_transformed(src, width, height, &BlendTransform::identity());
    }

    /// Draw `src` stretched over `width x height`, placed through `transform`.
    ///
    /// Destination pixels whose centre maps outside the drawn rectangle are
    /// left untouched.
    pub fn draw_image_transformed(
        &mut self,
        src: &Surface,
        width: u32,
        height: u32,
        transform: &BlendTransform,
    ) {
        if src.width == 0 || src.height == 0 || width == 0 || height == 0 {
            return;
        }
        let Some(inverse) = transform.invert() else {
            return;
        };

        let dst_w = self.width;
        let direct = transform.is_identity() && width == src.width && height == src.height;
        let sx = src.width as f64 / width as f64;
        let sy = src.height as f64 / height as f64;

        self.data
            .par_chunks_mut(dst_w as usize * CHANNELS)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..dst_w as usize {
                    let (lx, ly) = inverse.apply(x as f64 + 0.5, y as f64 + 0.5);
                    if lx < 0.0 || ly < 0.0 || lx >= width as f64 || ly >= height as f64 {
                        continue;
                    }
                    let px = if direct {
                        src.pixel(lx as u32, ly as u32)
                    } else {
                        src.sample_bilinear(lx * sx - 0.5, ly * sy - 0.5)
                    };
                    row[x * CHANNELS..x * CHANNELS + CHANNELS].copy_from_slice(&px);
                }
            });
    }

    /// Bilinear sample at fractional pixel coordinates, clamped to the edges.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> [u8; 4] {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x1, y0);
        let p01 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        let mut out = [0u8; 4];
        for c in 0..CHANNELS {
            let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
            let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
            out[c] = crate::clamp_u8(top * (1.0 - fy) + bottom * fy);
        }
        out
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Byte length of a `width x height` RGBA8 buffer.
#[inline]
pub fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> Surface {
        let mut s = Surface::new(w, h);
        for y in 0..h {
            for x in 0..w {
                s.set_pixel(x, y, [(x * 10) as u8, (y * 10) as u8, 7, 255]);
            }
        }
        s
    }

    #[test]
    fn test_from_rgba_validates_length() {
        assert!(Surface::from_rgba(2, 2, vec![0; 16]).is_ok());
        let err = Surface::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::BufferSizeMismatch { expected: 16, actual: 15 }));
    }

    #[test]
    fn test_set_size_clears() {
        let mut s = Surface::filled(2, 2, [9, 9, 9, 9]);
        s.set_size(3, 1);
        assert_eq!(s.dimensions(), (3, 1));
        assert!(s.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_draw_image_same_size_copies() {
        let src = gradient(4, 3);
        let mut dst = Surface::new(4, 3);
        dst.draw_image(&src, 4, 3);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_draw_image_upscale_nearest_corners() {
        let src = Surface::filled(1, 1, [10, 20, 30, 40]);
        let mut dst = Surface::new(3, 3);
        dst.draw_image(&src, 3, 3);
        assert!(dst.data().chunks(4).all(|p| p == [10, 20, 30, 40]));
    }

    #[test]
    fn test_draw_transformed_leaves_uncovered_pixels() {
        let src = Surface::filled(2, 2, [255, 0, 0, 255]);
        let mut dst = Surface::new(4, 4);
        let t = BlendTransform::placement(0.5, 0.5, 0.0, 0.0);
        dst.draw_image_transformed(&src, 4, 4, &t);
        assert_eq!(dst.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(dst.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(dst.pixel(2, 2), [0, 0, 0, 0]);
        assert_eq!(dst.pixel(3, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_get_put_image_data() {
        let src = gradient(3, 2);
        let bytes = src.get_image_data(3, 2);
        let mut dst = Surface::new(3, 2);
        dst.put_image_data(&bytes, 3, 2).unwrap();
        assert_eq!(dst, src);

        let crop = src.get_image_data(2, 1);
        assert_eq!(crop.len(), 8);
        assert_eq!(&crop[4..8], &src.pixel(1, 0));
    }
}
