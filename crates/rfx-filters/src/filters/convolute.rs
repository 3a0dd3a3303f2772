//! Square kernel convolution.

use std::borrow::Cow;

use rayon::prelude::*;
use rfx_core::{CHANNELS, Surface, clamp_u8};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_record, to_record};
use crate::filter::{PassInfo, UNIFORM_FLOATS, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterError, FilterResult, shaders};

/// Largest kernel side whose weights fit the parameter uniform.
pub const MAX_SIDE: u32 = 15;

/// Odd square kernel, row-major. Taps outside the image are skipped.
///
/// With `opaque` set the alpha channel is not convolved and each pixel keeps
/// its source alpha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Convolute {
    pub opaque: bool,
    pub matrix: Vec<f64>,
}

impl Default for Convolute {
    fn default() -> Self {
        Self { opaque: false, matrix: vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0] }
    }
}

impl Convolute {
    pub const TYPE: &'static str = "Convolute";

    /// Validated kernel.
    pub fn new(matrix: Vec<f64>, opaque: bool) -> FilterResult<Self> {
        let f = Self { opaque, matrix };
        f.side()?;
        Ok(f)
    }

    pub(crate) fn from_object(record: &Value) -> FilterResult<Self> {
        let f: Self = from_record(Self::TYPE, record)?;
        f.side()?;
        Ok(f)
    }

    /// Kernel side length; the weight count must be an odd square.
    pub fn side(&self) -> FilterResult<u32> {
        let n = self.matrix.len();
        let side = (n as f64).sqrt().round() as u32;
        if side == 0 || (side * side) as usize != n || side % 2 == 0 {
            return Err(FilterError::invalid(
                Self::TYPE,
                format!("kernel must be an odd square, got {n} weights"),
            ));
        }
        if side > MAX_SIDE {
            return Err(FilterError::invalid(Self::TYPE, format!("kernel side {side} exceeds {MAX_SIDE}")));
        }
        Ok(side)
    }
}

impl Filter for Convolute {
    fn filter_type(&self) -> &'static str {
        Self::TYPE
    }

    fn is_neutral_state(&self) -> bool {
        false
    }

    fn cache_key(&self) -> String {
        let side = (self.matrix.len() as f64).sqrt().round() as u32;
        format!("{}_{}_{}", Self::TYPE, side, u8::from(self.opaque))
    }

    fn to_object(&self) -> Value {
        to_record(Self::TYPE, self)
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        let side = self.side()? as i64;
        let half = side / 2;
        let src = &state.image;
        let (w, h) = src.dimensions();
        let (wi, hi) = (w as i64, h as i64);
        let weights = &self.matrix;
        let opaque = self.opaque;

        let mut out = vec![0u8; src.data().len()];
        out.par_chunks_mut(w as usize * CHANNELS).enumerate().for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..wi {
                let mut acc = [0.0f64; 4];
                for cy in 0..side {
                    let sy = y + cy - half;
                    if sy < 0 || sy >= hi {
                        continue;
                    }
                    for cx in 0..side {
                        let sx = x + cx - half;
                        if sx < 0 || sx >= wi {
                            continue;
                        }
                        let wt = weights[(cy * side + cx) as usize];
                        let p = src.pixel(sx as u32, sy as u32);
                        for c in 0..CHANNELS {
                            acc[c] += p[c] as f64 * wt;
                        }
                    }
                }
                let o = x as usize * CHANNELS;
                for c in 0..3 {
                    row[o + c] = clamp_u8(acc[c]);
                }
                row[o + 3] = if opaque { src.pixel(x as u32, y as u32)[3] } else { clamp_u8(acc[3]) };
            }
        });

        state.replace_image(Surface::from_rgba(w, h, out)?);
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        let side = (self.matrix.len() as f64).sqrt().round() as u32;
        Cow::Owned(shaders::convolute(side, self.opaque))
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        for w in self.matrix.iter().take(UNIFORM_FLOATS) {
            uniforms.push(*w as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    #[test]
    fn test_identity_reproduces_source() {
        let img = sample(6, 5);
        let f = Convolute::default();
        assert!(!f.is_neutral_state());
        assert_eq!(run_cpu(&f, &img), img);
    }

    #[test]
    fn test_box_blur_edges_skip_outside_taps() {
        let f = Convolute::new(vec![1.0 / 9.0; 9], false).unwrap();
        let img = Surface::filled(3, 3, [90, 90, 90, 255]);
        let out = run_cpu(&f, &img);
        // centre sees 9 taps, corner only 4
        assert_eq!(out.pixel(1, 1), [90, 90, 90, 255]);
        assert_eq!(out.pixel(0, 0), [40, 40, 40, 113]);
    }

    #[test]
    fn test_opaque_keeps_source_alpha() {
        let f = Convolute::new(vec![1.0 / 9.0; 9], true).unwrap();
        let img = Surface::filled(3, 3, [90, 90, 90, 255]);
        assert_eq!(run_cpu(&f, &img).pixel(0, 0), [40, 40, 40, 255]);
    }

    #[test]
    fn test_rejects_bad_kernels() {
        assert!(Convolute::new(vec![1.0; 4], false).is_err());
        assert!(Convolute::new(vec![1.0; 8], false).is_err());
        assert!(Convolute::new(vec![], false).is_err());
        assert!(Convolute::new(vec![0.0; 17 * 17], false).is_err());
        assert!(Convolute::new(vec![0.0; 25], true).is_ok());
    }

    #[test]
    fn test_cache_key_folds_side_and_opaque() {
        let a = Convolute::new(vec![0.0; 9], false).unwrap();
        let b = Convolute::new(vec![0.0; 25], false).unwrap();
        let c = Convolute::new(vec![0.0; 9], true).unwrap();
        assert_eq!(a.cache_key(), "Convolute_3_0");
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_ne!(a.fragment_shader(&PassInfo::single(1, 1)), c.fragment_shader(&PassInfo::single(1, 1)));
    }

    #[test]
    fn test_record() {
        let f = Convolute::new(vec![0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0], true).unwrap();
        assert_record_round_trip(&f);
    }
}
