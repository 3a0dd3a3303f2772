//! Hue rotation as a color matrix.

use std::borrow::Cow;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::color_matrix::{IDENTITY_MATRIX, apply_matrix, send_matrix};
use super::to_record;
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Rotates hue by `rotation * PI` radians. Range `-1.0..=1.0`.
///
/// The matrix is derived from the angle on every application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HueRotation {
    pub rotation: f64,
    pub colors_only: bool,
}

impl Default for HueRotation {
    fn default() -> Self {
        Self { rotation: 0.0, colors_only: true }
    }
}

impl HueRotation {
    pub const TYPE: &'static str = "HueRotation";

    pub fn new(rotation: f64) -> Self {
        Self { rotation, ..Default::default() }
    }

    pub fn matrix(&self) -> [f64; 20] {
        let rad = self.rotation * PI;
        let (sin, cos) = rad.sin_cos();
        let third: f64 = 1.0 / 3.0;
        let third_sqrt_sin = third.sqrt() * sin;
        let one_minus_cos = 1.0 - cos;

        let mut m = IDENTITY_MATRIX;
        m[0] = cos + one_minus_cos / 3.0;
        m[1] = third * one_minus_cos - third_sqrt_sin;
        m[2] = third * one_minus_cos + third_sqrt_sin;
        m[5] = third * one_minus_cos + third_sqrt_sin;
        m[6] = cos + third * one_minus_cos;
        m[7] = third * one_minus_cos - third_sqrt_sin;
        m[10] = third * one_minus_cos - third_sqrt_sin;
        m[11] = third * one_minus_cos + third_sqrt_sin;
        m[12] = cos + third * one_minus_cos;
        m
    }
}

impl MainParameter for HueRotation {
    type Value = f64;

    fn main_parameter(&self) -> f64 {
        self.rotation
    }

    fn neutral_value() -> f64 {
        0.0
    }
}

impl Filter for HueRotation {
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
        apply_matrix(state.image.data_mut(), &self.matrix(), self.colors_only);
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::COLOR_MATRIX)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        send_matrix(&self.matrix(), self.colors_only, uniforms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_rotation_is_identity() {
        let m = HueRotation::default().matrix();
        for (a, b) in m.iter().zip(IDENTITY_MATRIX.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
        assert_neutral_unchanged(&HueRotation::default());
    }

    #[test]
    fn test_third_turn_cycles_channels() {
        // 2/3 PI maps red to green
        let out = run_cpu(&HueRotation::new(2.0 / 3.0), &pixel([255, 0, 0, 255]));
        let [r, g, b, _] = out.pixel(0, 0);
        assert!(r <= 1);
        assert!(g >= 254);
        assert!(b <= 1);
    }

    #[test]
    fn test_quarter_turn_matrix() {
        let m = HueRotation::new(0.5).matrix();
        let third: f64 = 1.0 / 3.0;
        let root = third.sqrt();
        assert_abs_diff_eq!(m[0], third, epsilon = 1e-12);
        assert_abs_diff_eq!(m[1], third - root, epsilon = 1e-12);
        assert_abs_diff_eq!(m[2], third + root, epsilon = 1e-12);
        assert_abs_diff_eq!(m[5], third + root, epsilon = 1e-12);
        assert_abs_diff_eq!(m[10], third - root, epsilon = 1e-12);

        let out = run_cpu(&HueRotation::new(0.5), &pixel([255, 0, 0, 255]));
        assert_eq!(out.pixel(0, 0), [85, 232, 0, 255]);
    }

    #[test]
    fn test_gray_is_invariant() {
        let out = run_cpu(&HueRotation::new(0.37), &pixel([128, 128, 128, 255]));
        assert_eq!(out.pixel(0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn test_record() {
        assert_record_round_trip(&HueRotation::new(-0.5));
    }
}
