//! Saturation.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Pushes channels away from (positive) or toward (negative) the pixel's
/// maximum channel. Range `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Saturation {
    pub saturation: f64,
}

impl Saturation {
    pub const TYPE: &'static str = "Saturation";

    pub fn new(saturation: f64) -> Self {
        Self { saturation }
    }
}

impl MainParameter for Saturation {
    type Value = f64;

    fn main_parameter(&self) -> f64 {
        self.saturation
    }

    fn neutral_value() -> f64 {
        0.0
    }
}

impl Filter for Saturation {
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
        let adjust = -self.saturation;
        map_pixels(state.image.data_mut(), |px| {
            let max = px[0].max(px[1]).max(px[2]);
            for c in &mut px[..3] {
                if *c != max {
                    *c = clamp_u8(*c as f64 + (max as f64 - *c as f64) * adjust);
                }
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::SATURATION)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        uniforms.push(-self.saturation as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    #[test]
    fn test_full_desaturation_collapses_to_max() {
        let out = run_cpu(&Saturation::new(-1.0), &pixel([200, 100, 50, 255]));
        assert_eq!(out.pixel(0, 0), [200, 200, 200, 255]);
    }

    #[test]
    fn test_positive_saturation_spreads() {
        let out = run_cpu(&Saturation::new(0.5), &pixel([200, 100, 50, 255]));
        assert_eq!(out.pixel(0, 0), [200, 50, 0, 255]);
    }

    #[test]
    fn test_neutral() {
        assert_neutral_unchanged(&Saturation::default());
        assert_record_round_trip(&Saturation::new(0.3));
    }
}
