//! Concrete filters.
//!
//! # Catalogue
//!
//! | Group | Filters |
//! |---|---|
//! | Per-pixel | [`Brightness`], [`Contrast`], [`Saturation`], [`Vibrance`], [`Gamma`], [`Noise`], [`Invert`], [`Pixelate`], [`RemoveColor`], [`Grayscale`] |
//! | Color matrix | [`ColorMatrix`], [`HueRotation`], [`PresetFilter`] (Sepia, Brownie, ...) |
//! | Neighbourhood | [`Convolute`] |
//! | Separable | [`Blur`], [`Resize`] |
//! | Compositing | [`BlendColor`], [`BlendImage`] |
//! | Composite | [`Composed`] |
//!
//! Parameters serialize with camelCase names next to a `"type"` tag.

pub mod blend_color;
pub mod blend_image;
pub mod blur;
pub mod brightness;
pub mod color_matrix;
pub mod composed;
pub mod contrast;
pub mod convolute;
pub mod gamma;
pub mod grayscale;
pub mod hue_rotation;
pub mod invert;
pub mod noise;
pub mod pixelate;
pub mod remove_color;
pub mod resize;
pub mod saturation;
pub mod vibrance;

pub use blend_color::{BlendColor, BlendColorMode};
pub use blend_image::{BlendImage, BlendImageMode, BlendSource};
pub use blur::Blur;
pub use brightness::Brightness;
pub use color_matrix::{ColorMatrix, ColorMatrixPreset, IDENTITY_MATRIX, PresetFilter};
pub use composed::Composed;
pub use contrast::Contrast;
pub use convolute::Convolute;
pub use gamma::Gamma;
pub use grayscale::{Grayscale, GrayscaleMode};
pub use hue_rotation::HueRotation;
pub use invert::Invert;
pub use noise::Noise;
pub use pixelate::Pixelate;
pub use remove_color::RemoveColor;
pub use resize::{Resize, ResizeType};
pub use saturation::Saturation;
pub use vibrance::Vibrance;

use rayon::prelude::*;
use rfx_core::CHANNELS;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{FilterError, FilterResult};

/// `{ "type": tag, ...params }`.
pub(crate) fn to_record<T: Serialize>(tag: &str, params: &T) -> Value {
    let mut map = match serde_json::to_value(params) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    map.insert("type".to_string(), Value::String(tag.to_string()));
    Value::Object(map)
}

/// Parameters of a record; missing fields take their defaults.
pub(crate) fn from_record<T: DeserializeOwned>(tag: &str, record: &Value) -> FilterResult<T> {
    T::deserialize(record).map_err(|e| FilterError::InvalidRecord(format!("{tag}: {e}")))
}

/// Run `f` over every RGBA pixel.
pub(crate) fn map_pixels(data: &mut [u8], f: impl Fn(&mut [u8]) + Send + Sync) {
    data.par_chunks_mut(CHANNELS).for_each(f);
}

/// Run `f(y, row)` over every row of a `width`-wide buffer.
pub(crate) fn map_rows(data: &mut [u8], width: u32, f: impl Fn(usize, &mut [u8]) + Send + Sync) {
    let stride = (width as usize * CHANNELS).max(CHANNELS);
    data.par_chunks_mut(stride).enumerate().for_each(|(y, row)| f(y, row));
}
