//! Affine 4x5 color matrix and its named presets.
//!
//! The matrix is row-major; row `i` produces channel `i` from
//! `(r, g, b, a, 1)`, with the constant column in unit range. With
//! `colors_only` set, the alpha row and column are skipped.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_record, map_pixels, to_record};
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterError, FilterResult, shaders};

pub const IDENTITY_MATRIX: [f64; 20] = [
    1.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0,
];

/// Apply `matrix` to a byte buffer.
pub(crate) fn apply_matrix(data: &mut [u8], m: &[f64; 20], colors_only: bool) {
    map_pixels(data, |px| {
        let [r, g, b, a] = [px[0] as f64, px[1] as f64, px[2] as f64, px[3] as f64];
        if colors_only {
            px[0] = clamp_u8(r * m[0] + g * m[1] + b * m[2] + m[4] * 255.0);
            px[1] = clamp_u8(r * m[5] + g * m[6] + b * m[7] + m[9] * 255.0);
            px[2] = clamp_u8(r * m[10] + g * m[11] + b * m[12] + m[14] * 255.0);
        } else {
            px[0] = clamp_u8(r * m[0] + g * m[1] + b * m[2] + a * m[3] + m[4] * 255.0);
            px[1] = clamp_u8(r * m[5] + g * m[6] + b * m[7] + a * m[8] + m[9] * 255.0);
            px[2] = clamp_u8(r * m[10] + g * m[11] + b * m[12] + a * m[13] + m[14] * 255.0);
            px[3] = clamp_u8(r * m[15] + g * m[16] + b * m[17] + a * m[18] + m[19] * 255.0);
        }
    });
}

pub(crate) fn send_matrix(m: &[f64; 20], colors_only: bool, uniforms: &mut UniformBlock) {
    for v in m {
        uniforms.push(*v as f32);
    }
    uniforms.push(if colors_only { 1.0 } else { 0.0 });
}

// =============================================================================
// ColorMatrix
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorMatrix {
    pub matrix: [f64; 20],
    pub colors_only: bool,
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self { matrix: IDENTITY_MATRIX, colors_only: true }
    }
}

impl ColorMatrix {
    pub const TYPE: &'static str = "ColorMatrix";

    pub fn new(matrix: [f64; 20]) -> Self {
        Self { matrix, colors_only: true }
    }

    /// Build from a slice, which must hold exactly 20 values.
    pub fn from_slice(values: &[f64]) -> FilterResult<Self> {
        let matrix: [f64; 20] = values
            .try_into()
            .map_err(|_| FilterError::invalid(Self::TYPE, format!("expected 20 values, got {}", values.len())))?;
        Ok(Self::new(matrix))
    }

    pub fn with_colors_only(mut self, colors_only: bool) -> Self {
        self.colors_only = colors_only;
        self
    }
}

impl MainParameter for ColorMatrix {
    type Value = [f64; 20];

    fn main_parameter(&self) -> [f64; 20] {
        self.matrix
    }

    fn neutral_value() -> [f64; 20] {
        IDENTITY_MATRIX
    }
}

impl Filter for ColorMatrix {
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
        apply_matrix(state.image.data_mut(), &self.matrix, self.colors_only);
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::COLOR_MATRIX)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        send_matrix(&self.matrix, self.colors_only, uniforms);
    }
}

// =============================================================================
// Presets
// =============================================================================

/// Fixed-matrix color effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMatrixPreset {
    Sepia,
    BlackWhite,
    Brownie,
    Vintage,
    Kodachrome,
    Technicolor,
    Polaroid,
}

impl ColorMatrixPreset {
    pub const ALL: [ColorMatrixPreset; 7] = [
        Self::Sepia,
        Self::BlackWhite,
        Self::Brownie,
        Self::Vintage,
        Self::Kodachrome,
        Self::Technicolor,
        Self::Polaroid,
    ];

    /// Type tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sepia => "Sepia",
            Self::BlackWhite => "BlackWhite",
            Self::Brownie => "Brownie",
            Self::Vintage => "Vintage",
            Self::Kodachrome => "Kodachrome",
            Self::Technicolor => "Technicolor",
            Self::Polaroid => "Polaroid",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn matrix(&self) -> [f64; 20] {
        match self {
            Self::Sepia => [
                0.393, 0.769, 0.189, 0.0, 0.0, //
                0.349, 0.686, 0.168, 0.0, 0.0, //
                0.272, 0.534, 0.131, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            Self::BlackWhite => [
                1.5, 1.5, 1.5, 0.0, -1.0, //
                1.5, 1.5, 1.5, 0.0, -1.0, //
                1.5, 1.5, 1.5, 0.0, -1.0, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            Self::Brownie => [
                0.59970, 0.34553, -0.27082, 0.0, 0.186, //
                -0.03770, 0.86095, 0.15059, 0.0, -0.1449, //
                0.24113, -0.07441, 0.44972, 0.0, -0.02965, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            Self::Vintage => [
                0.62793, 0.32021, -0.03965, 0.0, 0.03784, //
                0.02578, 0.64411, 0.03259, 0.0, 0.02926, //
                0.04660, -0.08512, 0.52416, 0.0, 0.02023, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            Self::Kodachrome => [
                1.12855, -0.39673, -0.03992, 0.0, 0.24991, //
                -0.16404, 1.08352, -0.05498, 0.0, 0.09698, //
                -0.16786, -0.56034, 1.60148, 0.0, 0.13972, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            Self::Technicolor => [
                1.91252, -0.85453, -0.09155, 0.0, 0.04624, //
                -0.30878, 1.76589, -0.10601, 0.0, -0.27589, //
                -0.23110, -0.75018, 1.97813, 0.0, 0.12137, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            Self::Polaroid => [
                1.438, -0.062, -0.062, 0.0, 0.0, //
                -0.122, 1.378, -0.122, 0.0, 0.0, //
                -0.016, -0.016, 1.483, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }
}

/// A preset applied as a color matrix. Never neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetFilter {
    pub preset: ColorMatrixPreset,
    pub colors_only: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PresetParams {
    colors_only: bool,
}

impl Default for PresetParams {
    fn default() -> Self {
        Self { colors_only: true }
    }
}

impl PresetFilter {
    pub fn new(preset: ColorMatrixPreset) -> Self {
        Self { preset, colors_only: true }
    }

    pub(crate) fn from_object(preset: ColorMatrixPreset, record: &Value) -> FilterResult<Self> {
        let params: PresetParams = from_record(preset.name(), record)?;
        Ok(Self { preset, colors_only: params.colors_only })
    }
}

impl Filter for PresetFilter {
    fn filter_type(&self) -> &'static str {
        self.preset.name()
    }

    fn is_neutral_state(&self) -> bool {
        false
    }

    fn to_object(&self) -> Value {
        to_record(self.preset.name(), &PresetParams { colors_only: self.colors_only })
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        apply_matrix(state.image.data_mut(), &self.preset.matrix(), self.colors_only);
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::COLOR_MATRIX)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        send_matrix(&self.preset.matrix(), self.colors_only, uniforms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    #[test]
    fn test_identity_is_neutral_and_unchanged() {
        assert_neutral_unchanged(&ColorMatrix::default());
        assert_neutral_unchanged(&ColorMatrix::default().with_colors_only(false));
    }

    #[test]
    fn test_identity_full_matrix_keeps_alpha() {
        let img = sample(3, 3);
        let out = run_cpu(&ColorMatrix::new(IDENTITY_MATRIX).with_colors_only(false), &img);
        assert_eq!(out, img);
    }

    #[test]
    fn test_offset_column_is_unit_range() {
        let mut m = IDENTITY_MATRIX;
        m[4] = 0.1;
        let out = run_cpu(&ColorMatrix::new(m), &pixel([100, 0, 0, 255]));
        assert_eq!(out.pixel(0, 0), [126, 0, 0, 255]);
    }

    #[test]
    fn test_colors_only_skips_alpha_row() {
        let mut m = IDENTITY_MATRIX;
        m[18] = 0.0;
        let px = pixel([10, 20, 30, 200]);
        assert_eq!(run_cpu(&ColorMatrix::new(m), &px).pixel(0, 0)[3], 200);
        assert_eq!(run_cpu(&ColorMatrix::new(m).with_colors_only(false), &px).pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_sepia() {
        let out = run_cpu(&PresetFilter::new(ColorMatrixPreset::Sepia), &pixel([100, 100, 100, 255]));
        // 0.393 + 0.769 + 0.189 = 1.351
        assert_eq!(out.pixel(0, 0), [135, 120, 94, 255]);
    }

    #[test]
    fn test_presets_never_neutral() {
        for p in ColorMatrixPreset::ALL {
            assert!(!PresetFilter::new(p).is_neutral_state());
            assert_eq!(ColorMatrixPreset::from_name(p.name()), Some(p));
        }
    }

    #[test]
    fn test_from_slice_length() {
        assert!(ColorMatrix::from_slice(&IDENTITY_MATRIX).is_ok());
        assert!(ColorMatrix::from_slice(&[1.0; 19]).is_err());
    }

    #[test]
    fn test_records() {
        let mut m = IDENTITY_MATRIX;
        m[0] = 0.5;
        assert_record_round_trip(&ColorMatrix::new(m).with_colors_only(false));
        for p in ColorMatrixPreset::ALL {
            assert_record_round_trip(&PresetFilter::new(p));
        }
        let bad = serde_json::json!({ "type": "ColorMatrix", "matrix": [1.0, 2.0] });
        assert!(crate::registry::FilterRegistry::global().from_object_sync(&bad).is_err());
    }
}
