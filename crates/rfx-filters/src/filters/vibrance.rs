//! Vibrance: saturation weighted by how saturated a pixel already is.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Range `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Vibrance {
    pub vibrance: f64,
}

impl Vibrance {
    pub const TYPE: &'static str = "Vibrance";

    pub fn new(vibrance: f64) -> Self {
        Self { vibrance }
    }
}

impl MainParameter for Vibrance {
    type Value = f64;

    fn main_parameter(&self) -> f64 {
        self.vibrance
    }

    fn neutral_value() -> f64 {
        0.0
    }
}

impl Filter for Vibrance {
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
        let adjust = -self.vibrance;
        map_pixels(state.image.data_mut(), |px| {
            let max = px[0].max(px[1]).max(px[2]);
            let avg = (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0;
            let amt = ((max as f64 - avg).abs() * 2.0 / 255.0) * adjust;
            for c in &mut px[..3] {
                if *c != max {
                    *c = clamp_u8(*c as f64 + (max as f64 - *c as f64) * amt);
                }
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::VIBRANCE)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        uniforms.push(-self.vibrance as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    #[test]
    fn test_gray_pixels_untouched() {
        let out = run_cpu(&Vibrance::new(1.0), &pixel([90, 90, 90, 255]));
        assert_eq!(out.pixel(0, 0), [90, 90, 90, 255]);
    }

    #[test]
    fn test_negative_vibrance_pulls_toward_max() {
        let out = run_cpu(&Vibrance::new(-1.0), &pixel([255, 0, 0, 255]));
        // avg 85, amt = 340 / 255
        let [r, g, b, _] = out.pixel(0, 0);
        assert_eq!(r, 255);
        assert_eq!(g, b);
        assert!(g > 200);
    }

    #[test]
    fn test_neutral() {
        assert_neutral_unchanged(&Vibrance::default());
        assert_record_round_trip(&Vibrance::new(0.6));
    }
}
