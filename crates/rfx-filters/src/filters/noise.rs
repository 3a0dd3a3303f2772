//! Seeded luminance noise.
//!
//! The per-pixel random value comes from a PCG hash of the pixel position and
//! seed, so both backends produce the same noise for the same parameters.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_rows, to_record};
use crate::filter::{PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Adds `(0.5 - r) * noise` to every color channel, `r` in `0..1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Noise {
    /// Amplitude in byte units, typically `0..=1000`.
    pub noise: f64,
    pub seed: u32,
}

impl Noise {
    pub const TYPE: &'static str = "Noise";

    pub fn new(noise: f64) -> Self {
        Self { noise, seed: 0 }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }
}

#[inline]
fn pcg(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Uniform value in `0..1` for pixel `(x, y)`.
pub(crate) fn noise_at(x: u32, y: u32, seed: u32) -> f64 {
    pcg(x ^ pcg(y ^ pcg(seed))) as f64 / 4_294_967_296.0
}

impl Filter for Noise {
    fn filter_type(&self) -> &'static str {
        Self::TYPE
    }

    fn is_neutral_state(&self) -> bool {
        false
    }

    fn to_object(&self) -> Value {
        to_record(Self::TYPE, self)
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        let (noise, seed) = (self.noise, self.seed);
        let width = state.image.width();
        map_rows(state.image.data_mut(), width, |y, row| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let rand = (0.5 - noise_at(x as u32, y as u32, seed)) * noise;
                for c in &mut px[..3] {
                    *c = clamp_u8(*c as f64 + rand);
                }
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::NOISE)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        uniforms.push((self.noise / 255.0) as f32);
        // Halves stay exact in f32.
        uniforms.push((self.seed & 0xffff) as f32);
        uniforms.push((self.seed >> 16) as f32);
    }
}
