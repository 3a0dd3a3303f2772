//! Grayscale conversion.

use std::borrow::Cow;

use rfx_core::clamp_u8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{map_pixels, to_record};
use crate::filter::PassInfo;
use crate::state::CpuPipelineState;
use crate::{Filter, FilterResult, shaders};

/// How the gray level is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrayscaleMode {
    /// Mean of the three channels.
    #[default]
    Average,
    /// Midpoint of the smallest and largest channel.
    Lightness,
    /// `0.21 R + 0.72 G + 0.07 B`.
    Luminosity,
}

impl GrayscaleMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Lightness => "lightness",
            Self::Luminosity => "luminosity",
        }
    }

    fn level(&self, r: f64, g: f64, b: f64) -> f64 {
        match self {
            Self::Average => (r + g + b) / 3.0,
            Self::Lightness => (r.min(g).min(b) + r.max(g).max(b)) / 2.0,
            Self::Luminosity => 0.21 * r + 0.72 * g + 0.07 * b,
        }
    }

    fn shader_expr(&self) -> &'static str {
        match self {
            Self::Average => "(c.r + c.g + c.b) / 3.0",
            Self::Lightness => "(min(c.r, min(c.g, c.b)) + max(c.r, max(c.g, c.b))) / 2.0",
            Self::Luminosity => "0.21 * c.r + 0.72 * c.g + 0.07 * c.b",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Grayscale {
    pub mode: GrayscaleMode,
}

impl Grayscale {
    pub const TYPE: &'static str = "Grayscale";

    pub fn new(mode: GrayscaleMode) -> Self {
        Self { mode }
    }
}

impl Filter for Grayscale {
    fn filter_type(&self) -> &'static str {
        Self::TYPE
    }

    /// Already-gray images are unaffected, but that depends on the pixels.
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
        let mode = self.mode;
        map_pixels(state.image.data_mut(), |px| {
            let v = clamp_u8(mode.level(px[0] as f64, px[1] as f64, px[2] as f64));
            px[..3].fill(v);
        });
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Owned(shaders::grayscale(self.mode.shader_expr()))
    }
}
