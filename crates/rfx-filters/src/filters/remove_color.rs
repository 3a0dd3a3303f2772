//! Color keying.

use std::borrow::Cow;

use rfx_core::Color;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Makes pixels within `distance` of `color` fully transparent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoveColor {
    pub color: Color,
    /// Per-channel tolerance, `0.0..=1.0` of the byte range.
    pub distance: f64,
}

impl Default for RemoveColor {
    fn default() -> Self {
        Self { color: Color::WHITE, distance: 0.02 }
    }
}

impl RemoveColor {
    pub const TYPE: &'static str = "RemoveColor";

    pub fn new(color: Color, distance: f64) -> Self {
        Self { color, distance }
    }

    /// Exclusive `(low, high)` bounds in byte units.
    fn bounds(&self) -> ([f64; 3], [f64; 3]) {
        let d = self.distance * 255.0;
        let rgb = self.color.rgb_bytes().map(f64::from);
        (rgb.map(|c| c - d), rgb.map(|c| c + d))
    }
}

impl Filter for RemoveColor {
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
        let (low, high) = self.bounds();
        map_pixels(state.image.data_mut(), |px| {
            let inside = (0..3).all(|c| {
                let v = px[c] as f64;
                v > low[c] && v < high[c]
            });
            if inside {
                px[3] = 0;
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::REMOVE_COLOR)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        let (low, high) = self.bounds();
        uniforms.push_slice(&low.map(|v| (v / 255.0) as f32));
        uniforms.push(0.0);
        uniforms.push_slice(&high.map(|v| (v / 255.0) as f32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    #[test]
    fn test_keys_out_near_color() {
        let f = RemoveColor::new(Color::rgb(0, 255, 0), 0.1);
        assert_eq!(run_cpu(&f, &pixel([10, 250, 5, 255])).pixel(0, 0), [10, 250, 5, 0]);
        assert_eq!(run_cpu(&f, &pixel([60, 250, 5, 255])).pixel(0, 0), [60, 250, 5, 255]);
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let f = RemoveColor::new(Color::rgb(100, 100, 100), 0.0);
        assert_eq!(run_cpu(&f, &pixel([100, 100, 100, 255])).pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_never_neutral() {
        assert!(!RemoveColor::default().is_neutral_state());
    }

    #[test]
    fn test_record() {
        let f = RemoveColor::new(Color::rgb(1, 2, 3), 0.3);
        assert_eq!(f.to_object()["color"], "#010203");
        assert_record_round_trip(&f);
    }
}
