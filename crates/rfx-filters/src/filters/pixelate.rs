//! Block pixelation.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::to_record;
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Fills each `blocksize x blocksize` block with its top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pixelate {
    pub blocksize: u32,
}

impl Default for Pixelate {
    fn default() -> Self {
        Self { blocksize: 4 }
    }
}

impl Pixelate {
    pub const TYPE: &'static str = "Pixelate";

    pub fn new(blocksize: u32) -> Self {
        Self { blocksize }
    }
}

impl MainParameter for Pixelate {
    type Value = u32;

    fn main_parameter(&self) -> u32 {
        self.blocksize.max(1)
    }

    fn neutral_value() -> u32 {
        1
    }
}

impl Filter for Pixelate {
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
        let bs = self.blocksize.max(1);
        let image = &mut state.image;
        let (w, h) = image.dimensions();
        for by in (0..h).step_by(bs as usize) {
            for bx in (0..w).step_by(bs as usize) {
                let color = image.pixel(bx, by);
                for y in by..(by + bs).min(h) {
                    for x in bx..(bx + bs).min(w) {
                        image.set_pixel(x, y, color);
                    }
                }
            }
        }
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::PIXELATE)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        uniforms.push(self.blocksize.max(1) as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;

    #[test]
    fn test_blocks_take_top_left() {
        let img = sample(5, 3);
        let out = run_cpu(&Pixelate::new(2), &img);
        assert_eq!(out.pixel(1, 1), img.pixel(0, 0));
        assert_eq!(out.pixel(3, 0), img.pixel(2, 0));
        assert_eq!(out.pixel(4, 2), img.pixel(4, 2));
    }

    #[test]
    fn test_neutral() {
        assert_neutral_unchanged(&Pixelate::new(1));
        assert!(!Pixelate::default().is_neutral_state());
        assert_record_round_trip(&Pixelate::new(8));
    }
}
