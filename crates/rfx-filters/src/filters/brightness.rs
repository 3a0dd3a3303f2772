//! Brightness offset.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::{MainParameter, PassInfo, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// Adds `brightness * 255` to every color channel. Range `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Brightness {
    pub brightness: f64,
}

impl Brightness {
    pub const TYPE: &'static str = "Brightness";

    pub fn new(brightness: f64) -> Self {
        Self { brightness }
    }
}

impl MainParameter for Brightness {
    type Value = f64;

    fn main_parameter(&self) -> f64 {
        self.brightness
    }

    fn neutral_value() -> f64 {
        0.0
    }
}

impl Filter for Brightness {
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
        let step = (self.brightness * 255.0).round();
        map_pixels(state.image.data_mut(), |px| {
            for c in &mut px[..3] {
                *c = clamp_u8(*c as f64 + step);
            }
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::BRIGHTNESS)
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        uniforms.push(self.brightness as f32);
    }
}
