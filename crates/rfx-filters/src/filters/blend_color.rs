//! Blend against a constant color.

use std::borrow::Cow;

use rfx_core::{Color, clamp_u8};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Arithmetic between a pixel channel `c` and the color channel `t`
/// (pre-scaled by `alpha`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendColorMode {
    #[default]
    Multiply,
    Screen,
    Add,
    Difference,
    Subtract,
    Darken,
    Lighten,
    Overlay,
    Exclusion,
    Tint,
}

impl BlendColorMode {
    pub const ALL: [BlendColorMode; 10] = [
        Self::Multiply,
        Self::Screen,
        Self::Add,
        Self::Difference,
        Self::Subtract,
        Self::Darken,
        Self::Lighten,
        Self::Overlay,
        Self::Exclusion,
        Self::Tint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Add => "add",
            Self::Difference => "difference",
            Self::Subtract => "subtract",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::Overlay => "overlay",
            Self::Exclusion => "exclusion",
            Self::Tint => "tint",
        }
    }

    /// Byte-range blend. `inv_alpha` is `1 - alpha`.
    #[inline]
    fn blend(&self, c: f64, t: f64, inv_alpha: f64) -> f64 {
        match self {
            Self::Multiply => c * t / 255.0,
            Self::Screen => 255.0 - (255.0 - c) * (255.0 - t) / 255.0,
            Self::Add => c + t,
            Self::Difference => (c - t).abs(),
            Self::Subtract => c - t,
            Self::Darken => c.min(t),
            Self::Lighten => c.max(t),
            Self::Overlay => {
                if t < 128.0 {
                    2.0 * c * t / 255.0
                } else {
                    255.0 - 2.0 * (255.0 - c) * (255.0 - t) / 255.0
                }
            }
            Self::Exclusion => t + c - 2.0 * t * c / 255.0,
            Self::Tint => t + c * inv_alpha,
        }
    }

    /// Unit-range WGSL over `c`, `t` and `alpha`.
    fn shader_expr(&self) -> &'static str {
        match self {
            Self::Multiply => "c * t",
            Self::Screen => "vec3<f32>(1.0) - (vec3<f32>(1.0) - c) * (vec3<f32>(1.0) - t)",
            Self::Add => "c + t",
            Self::Difference => "abs(c - t)",
            Self::Subtract => "c - t",
            Self::Darken => "min(c, t)",
            Self::Lighten => "max(c, t)",
            Self::Overlay => {
                "select(vec3<f32>(1.0) - 2.0 * (vec3<f32>(1.0) - c) * (vec3<f32>(1.0) - t), 2.0 * c * t, t < vec3<f32>(128.0 / 255.0))"
            }
            Self::Exclusion => "t + c - 2.0 * t * c",
            Self::Tint => "t + c * (1.0 - alpha)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlendColor {
    pub color: Color,
    pub mode: BlendColorMode,
    /// Strength of the color, `0.0..=1.0`.
    pub alpha: f64,
}

impl Default for BlendColor {
    fn default() -> Self {
        Self { color: Color::rgb(0xF9, 0x5C, 0x63), mode: BlendColorMode::Multiply, alpha: 1.0 }
    }
}

impl BlendColor {
    pub const TYPE: &'static str = "BlendColor";

    pub fn new(color: Color, mode: BlendColorMode, alpha: f64) -> Self {
        Self { color, mode, alpha }
    }
}

impl Filter for BlendColor {
    fn filter_type(&self) -> &'static str {
        Self::TYPE
    }

    fn is_neutral_state(&self) -> bool {
        false
    }

    fn cache_key(&self) -> String {
        format!("{}_{}", Self::TYPE, self.mode.name())
    }

    fn to_object(&self) -> Value {
        to_record(Self::TYPE, self)
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        let t = self.color.rgb_bytes().map(|v| v as f64 * self.alpha);
        let inv_alpha = 1.0 - self.alpha;
        let mode = self.mode;
        map_pixels(state.image.data_mut(), |px| {
            for (c, t) in px[..3].iter_mut().zip(t) {
                *c = clamp_u8(mode.blend(*c as f64, t, inv_alpha));
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Owned(shaders::blend_color(self.mode.shader_expr()))
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        let [r, g, b, _] = self.color.to_unit();
        let a = self.alpha as f32;
        uniforms.push_slice(&[r * a, g * a, b * a, a]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    fn blend(mode: BlendColorMode, color: [u8; 3], alpha: f64, px: [u8; 4]) -> [u8; 4] {
        let f = BlendColor::new(Color::rgb(color[0], color[1], color[2]), mode, alpha);
        run_cpu(&f, &pixel(px)).pixel(0, 0)
    }

    #[test]
    fn test_modes() {
        let px = [200, 100, 50, 77];
        let c = [100, 200, 0];
        assert_eq!(blend(BlendColorMode::Multiply, c, 1.0, px), [78, 78, 0, 77]);
        assert_eq!(blend(BlendColorMode::Screen, c, 1.0, px), [222, 222, 50, 77]);
        assert_eq!(blend(BlendColorMode::Add, c, 1.0, px), [255, 255, 50, 77]);
        assert_eq!(blend(BlendColorMode::Difference, c, 1.0, px), [100, 100, 50, 77]);
        assert_eq!(blend(BlendColorMode::Subtract, c, 1.0, px), [100, 0, 50, 77]);
        assert_eq!(blend(BlendColorMode::Darken, c, 1.0, px), [100, 100, 0, 77]);
        assert_eq!(blend(BlendColorMode::Lighten, c, 1.0, px), [200, 200, 50, 77]);
        assert_eq!(blend(BlendColorMode::Exclusion, c, 1.0, px), [143, 143, 50, 77]);
    }

    #[test]
    fn test_overlay_switches_at_mid() {
        // t < 128: 2ct/255, otherwise screen-like
        assert_eq!(blend(BlendColorMode::Overlay, [100, 200, 0], 1.0, [200, 100, 50, 255]), [157, 188, 0, 255]);
    }

    #[test]
    fn test_tint_with_alpha() {
        // t = 100 * 0.5, c * 0.5
        assert_eq!(blend(BlendColorMode::Tint, [100, 0, 0], 0.5, [200, 100, 50, 255]), [150, 50, 25, 255]);
        assert_eq!(blend(BlendColorMode::Tint, [9, 9, 9], 0.0, [200, 100, 50, 255]), [200, 100, 50, 255]);
    }

    #[test]
    fn test_cache_key_per_mode() {
        let keys: std::collections::HashSet<_> = BlendColorMode::ALL
            .iter()
            .map(|&m| BlendColor { mode: m, ..Default::default() }.cache_key())
            .collect();
        assert_eq!(keys.len(), BlendColorMode::ALL.len());
    }

    #[test]
    fn test_record() {
        let f = BlendColor::new(Color::rgb(1, 2, 3), BlendColorMode::Overlay, 0.5);
        assert_eq!(
            f.to_object(),
            serde_json::json!({ "type": "BlendColor", "color": "#010203", "mode": "overlay", "alpha": 0.5 })
        );
        assert_record_round_trip(&f);
    }
}
