//! Per-channel gamma.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Raises each color channel to `1 / gamma[c]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Gamma {
    pub gamma: [f64; 3],
}

impl Default for Gamma {
    fn default() -> Self {
        Self { gamma: [1.0; 3] }
    }
}

impl Gamma {
    pub const TYPE: &'static str = "Gamma";

    pub fn new(gamma: [f64; 3]) -> Self {
        Self { gamma }
    }

    /// 256-entry lookup table per channel.
    fn lookup_tables(&self) -> [[u8; 256]; 3] {
        let mut lut = [[0u8; 256]; 3];
        for (table, g) in lut.iter_mut().zip(self.gamma) {
            let inv = 1.0 / g;
            for (i, v) in table.iter_mut().enumerate() {
                *v = clamp_u8((i as f64 / 255.0).powf(inv) * 255.0);
            }
        }
        lut
    }
}

impl MainParameter for Gamma {
    type Value = [f64; 3];

    fn main_parameter(&self) -> [f64; 3] {
        self.gamma
    }

    fn neutral_value() -> [f64; 3] {
        [1.0; 3]
    }
}

impl Filter for Gamma {
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
        let lut = self.lookup_tables();
        map_pixels(state.image.data_mut(), |px| {
            for (c, table) in px[..3].iter_mut().zip(&lut) {
                *c = table[*c as usize];
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::GAMMA)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        for g in self.gamma {
            uniforms.push((1.0 / g) as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    #[test]
    fn test_identity_table() {
        let lut = Gamma::default().lookup_tables();
        assert!(lut.iter().all(|t| t.iter().enumerate().all(|(i, &v)| v as usize == i)));
    }

    #[test]
    fn test_gamma_brightens_midtones() {
        let out = run_cpu(&Gamma::new([2.0, 1.0, 0.5]), &pixel([64, 64, 64, 255]));
        let [r, g, b, a] = out.pixel(0, 0);
        // 255 * sqrt(64/255) = 127.75
        assert_eq!(r, 128);
        assert_eq!(g, 64);
        assert!(b < 64);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_neutral_array_parameter() {
        assert_neutral_unchanged(&Gamma::default());
        assert!(!Gamma::new([1.0, 1.0, 1.1]).is_neutral_state());
        assert_record_round_trip(&Gamma::new([0.5, 1.5, 2.2]));
    }
}
