//! Color inversion.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// `255 - c` on color channels, and on alpha when `alpha` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Invert {
    pub invert: bool,
    pub alpha: bool,
}

impl Default for Invert {
    fn default() -> Self {
        Self { invert: true, alpha: false }
    }
}

impl Invert {
    pub const TYPE: &'static str = "Invert";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }
}

impl MainParameter for Invert {
    type Value = bool;

    fn main_parameter(&self) -> bool {
        self.invert
    }

    fn neutral_value() -> bool {
        false
    }
}

impl Filter for Invert {
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
        if !self.invert {
            return Ok(());
        }
        let channels = if self.alpha { 4 } else { 3 };
        map_pixels(state.image.data_mut(), |px| {
            for c in &mut px[..channels] {
                *c = 255 - *c;
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::INVERT)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        uniforms.push(if self.invert { 1.0 } else { 0.0 });
        uniforms.push(if self.alpha { 1.0 } else { 0.0 });
    }
}
