//! Separable triangle blur.
//!
//! Each pass averages 31 samples along one axis, weighted by a triangle
//! `1 - |t|/15`. The sample span is `blur * 0.12` of the image extent along
//! the pass axis, shortened on the longer axis so the blur looks round on
//! non-square images.

use std::borrow::Cow;

use rfx_core::{CHANNELS, Surface, clamp_u8};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::to_record;
use crate::backend::ScratchSlot;
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

const HALF_TAPS: i32 = 15;

/// Blur amount, `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Blur {
    pub blur: f64,
}

impl Blur {
    pub const TYPE: &'static str = "Blur";

    pub fn new(blur: f64) -> Self {
        Self { blur }
    }

    /// Sample span along the pass axis, in texture coordinates.
    fn delta(&self, horizontal: bool, aspect_ratio: f64) -> [f64; 2] {
        let mut scale = 1.0;
        if horizontal {
            if aspect_ratio > 1.0 {
                scale = 1.0 / aspect_ratio;
            }
        } else if aspect_ratio < 1.0 {
            scale = aspect_ratio;
        }
        let d = scale * self.blur * 0.12;
        if horizontal { [d, 0.0] } else { [0.0, d] }
    }
}

/// One blur pass from `src` into `dst`, offsets in pixels.
fn blur_pass(src: &Surface, dst: &mut Surface, dx: f64, dy: f64) {
    let (w, _) = src.dimensions();
    super::map_rows(dst.data_mut(), w, |y, row| {
        for x in 0..w as usize {
            let mut acc = [0.0f64; 4];
            let mut total = 0.0;
            for t in -HALF_TAPS..=HALF_TAPS {
                let percent = t as f64 / HALF_TAPS as f64;
                let weight = 1.0 - percent.abs();
                let p = src.sample_bilinear(x as f64 + dx * percent, y as f64 + dy * percent);
                for c in 0..CHANNELS {
                    acc[c] += p[c] as f64 * weight;
                }
                total += weight;
            }
            for c in 0..CHANNELS {
                row[x * CHANNELS + c] = clamp_u8(acc[c] / total);
            }
        }
    });
}

impl MainParameter for Blur {
    type Value = f64;

    fn main_parameter(&self) -> f64 {
        self.blur
    }

    fn neutral_value() -> f64 {
        0.0
    }
}

impl Filter for Blur {
    fn filter_type(&self) -> &'static str {
        Self::TYPE
    }

    fn is_neutral_state(&self) -> bool {
        self.main_parameter_is_neutral()
    }

    fn to_object(&self) -> Value {
        to_record(Self::TYPE, self)
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        if self.is_neutral_state() {
            return Ok(());
        }
        let (w, h) = state.image.dimensions();
        let aspect = w as f64 / h.max(1) as f64;
        let [dx, _] = self.delta(true, aspect);
        let [_, dy] = self.delta(false, aspect);

        let mut layer1 = state.resources.take(ScratchSlot::BlurLayer1, w, h);
        let mut layer2 = state.resources.take(ScratchSlot::BlurLayer2, w, h);
        blur_pass(&state.image, &mut layer1, dx * w as f64, 0.0);
        blur_pass(&layer1, &mut layer2, 0.0, dy * h as f64);
        state.image.data_mut().copy_from_slice(layer2.data());
        state.resources.put(ScratchSlot::BlurLayer1, layer1);
        state.resources.put(ScratchSlot::BlurLayer2, layer2);
        Ok(())
    }

    fn gpu_pass_count(&self) -> u32 {
        2
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::BLUR)
    }

    fn send_uniform_data(&self, pass: &PassInfo, uniforms: &mut UniformBlock) {
        let [dx, dy] = self.delta(pass.horizontal, pass.aspect_ratio());
        uniforms.push(dx as f32);
        uniforms.push(dy as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScratchPool;
    use crate::filters::test_util::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_image_stays_flat() {
        let img = Surface::filled(9, 6, [40, 80, 120, 255]);
        assert_eq!(run_cpu(&Blur::new(0.5), &img), img);
    }

    #[test]
    fn test_blur_spreads_a_dot() {
        let mut img = Surface::filled(21, 21, [0, 0, 0, 255]);
        img.set_pixel(10, 10, [255, 255, 255, 255]);
        let out = run_cpu(&Blur::new(0.5), &img);
        assert!(out.pixel(10, 10)[0] < 255);
        assert!(out.pixel(11, 10)[0] > 0);
        assert!(out.pixel(10, 11)[0] > 0);
    }

    #[test]
    fn test_uses_both_blur_layers() {
        let mut pool = ScratchPool::new();
        run_cpu_with(&Blur::new(0.2), &sample(8, 8), &mut pool);
        assert!(pool.is_allocated(ScratchSlot::BlurLayer1));
        assert!(pool.is_allocated(ScratchSlot::BlurLayer2));
    }

    #[test]
    fn test_aspect_correction() {
        let b = Blur::new(1.0);
        assert_relative_eq!(b.delta(true, 2.0)[0], 0.06);
        assert_relative_eq!(b.delta(false, 2.0)[1], 0.12);
        assert_relative_eq!(b.delta(false, 0.5)[1], 0.06);
    }

    #[test]
    fn test_two_passes() {
        let b = Blur::new(0.3);
        let plan = b.plan_passes(10, 4);
        assert_eq!(b.gpu_pass_count(), 2);
        assert_eq!(plan.len(), 2);
        assert!(plan[0].horizontal && !plan[1].horizontal);
    }

    #[test]
    fn test_neutral() {
        assert_neutral_unchanged(&Blur::default());
        assert_record_round_trip(&Blur::new(0.4));
    }
}
