//! Blend against a second, affine-placed image.
//!
//! The image is drawn at its natural size through `transform` onto a
//! transparent layer the size of the working buffer. Pixels it does not cover
//! blend against transparent black.

use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;
use rfx_core::{BlendTransform, CHANNELS, Surface, clamp_u8};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_record, to_record};
use crate::backend::ScratchSlot;
use crate::filter::{PassInfo, SecondarySource, UniformBlock};
use crate::registry::LoadOptions;
use crate::state::CpuPipelineState;
use crate::{Filter, FilterError, FilterResult, shaders};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendImageMode {
    /// Every channel, alpha included, scaled by the image's.
    #[default]
    Multiply,
    /// Alpha replaced by the image's alpha.
    Mask,
}

impl BlendImageMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Multiply => "multiply",
            Self::Mask => "mask",
        }
    }

    fn shader_expr(&self) -> &'static str {
        match self {
            Self::Multiply => "c * t",
            Self::Mask => "vec4<f32>(c.rgb, t.a)",
        }
    }
}

/// Loaded second image with its placement.
#[derive(Debug, Clone)]
pub struct BlendSource {
    /// Identifier the image was loaded from; also the GPU texture cache key.
    pub src: String,
    pub surface: Arc<Surface>,
    pub transform: BlendTransform,
}

impl BlendSource {
    pub fn new(src: impl Into<String>, surface: Arc<Surface>) -> Self {
        Self { src: src.into(), surface, transform: BlendTransform::identity() }
    }

    pub fn with_transform(mut self, transform: BlendTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// Serialized form of [`BlendSource`]; pixels are not stored.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageRecord {
    src: String,
    #[serde(default)]
    transform_matrix: BlendTransform,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlendImageRecord {
    #[serde(default)]
    mode: BlendImageMode,
    image: ImageRecord,
}

#[derive(Debug, Clone)]
pub struct BlendImage {
    pub image: BlendSource,
    pub mode: BlendImageMode,
}

impl BlendImage {
    pub const TYPE: &'static str = "BlendImage";

    pub fn new(image: BlendSource, mode: BlendImageMode) -> Self {
        Self { image, mode }
    }

    /// Rebuild from a record, fetching the image through `options.loader`.
    pub(crate) async fn load(record: &Value, options: &LoadOptions) -> FilterResult<Self> {
        let parsed: BlendImageRecord = from_record(Self::TYPE, record)?;
        let loader = options
            .loader
            .as_ref()
            .ok_or_else(|| FilterError::SourceLoad { src: parsed.image.src.clone(), message: "no loader".into() })?;
        options.signal.check()?;
        let surface = loader.load(&parsed.image.src).await?;
        options.signal.check()?;
        tracing::debug!(src = %parsed.image.src, width = surface.width(), height = surface.height(), "Loaded blend image");
        Ok(Self {
            image: BlendSource { src: parsed.image.src, surface, transform: parsed.image.transform_matrix },
            mode: parsed.mode,
        })
    }
}

impl Filter for BlendImage {
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
        to_record(
            Self::TYPE,
            &BlendImageRecord {
                mode: self.mode,
                image: ImageRecord { src: self.image.src.clone(), transform_matrix: self.image.transform },
            },
        )
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        let (w, h) = state.image.dimensions();
        let img = &self.image.surface;
        let mut layer = state.resources.take(ScratchSlot::BlendImage, w, h);
        layer.clear();
        layer.draw_image_transformed(img, img.width(), img.height(), &self.image.transform);

        let mode = self.mode;
        state
            .image
            .data_mut()
            .par_chunks_mut(CHANNELS)
            .zip(layer.data().par_chunks(CHANNELS))
            .for_each(|(px, t)| match mode {
                BlendImageMode::Multiply => {
                    for (c, t) in px.iter_mut().zip(t) {
                        *c = clamp_u8(*c as f64 * *t as f64 / 255.0);
                    }
                }
                BlendImageMode::Mask => px[3] = t[3],
            });

        state.resources.put(ScratchSlot::BlendImage, layer);
        Ok(())
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Owned(shaders::blend_image(self.mode.shader_expr()))
    }

    fn send_uniform_data(&self, _pass: &PassInfo, uniforms: &mut UniformBlock) {
        // Singular placement covers nothing: zero size fails the bounds test.
        match self.image.transform.invert() {
            Some(inverse) => {
                for v in inverse.0 {
                    uniforms.push(v as f32);
                }
                uniforms.push(self.image.surface.width() as f32);
                uniforms.push(self.image.surface.height() as f32);
            }
            None => uniforms.push_slice(&[0.0; 8]),
        }
    }

    fn secondary_source(&self) -> Option<SecondarySource<'_>> {
        Some(SecondarySource { key: &self.image.src, surface: &self.image.surface })
    }
}
