//! Contrast around mid-gray.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Scales channel distance from 128. Range `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Contrast {
    pub contrast: f64,
}

impl Contrast {
    pub const TYPE: &'static str = "Contrast";

    pub fn new(contrast: f64) -> Self {
        Self { contrast }
    }

    /// Multiplier applied to `value - 128`.
    pub fn factor(&self) -> f64 {
        let c = (self.contrast * 255.0).floor();
        (259.0 * (c + 255.0)) / (255.0 * (259.0 - c))
    }
}

impl MainParameter for Contrast {
    type Value = f64;

    fn main_parameter(&self) -> f64 {
        self.contrast
    }

    fn neutral_value() -> f64 {
        0.0
    }
}

impl Filter for Contrast {
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
        let f = self.factor();
        map_pixels(state.image.data_mut(), |px| {
            for c in &mut px[..3] {
                *c = clamp_u8(f * (*c as f64 - 128.0) + 128.0);
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::CONTRAST)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        uniforms.push(self.factor() as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_golden_value() {
        let out = run_cpu(&Contrast::new(0.2), &pixel([200, 100, 50, 1]));
        assert_eq!(out.pixel(0, 0), [236, 86, 11, 1]);
    }

    #[test]
    fn test_factor_at_zero_is_one() {
        assert_relative_eq!(Contrast::default().factor(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_neutral() {
        assert_neutral_unchanged(&Contrast::default());
        assert_record_round_trip(&Contrast::new(-0.4));
    }
}
