//! # rfx-core
//!
//! Core raster types for the rasterfx filter engine.
//!
//! - [`Surface`] - straight-alpha RGBA8 buffer, the 2D drawing target
//! - [`Canvas`] - filter destination with an optional 2D context
//! - [`Color`] - CSS-style color parsing for filter parameters
//! - [`BlendTransform`] - affine placement of a blended image
//! - [`FilterConfig`] - backend configuration with environment overrides
//!
//! ## Crate Structure
//!
//! ```text
//! rfx-core (this crate)
//!    ^
//!    |
//!    +-- rfx-filters (backends, pipeline, filters)
//!    +-- rfx-cli (command-line front end)
//! ```

pub mod canvas;
pub mod color;
pub mod config;
pub mod error;
pub mod pixel;
pub mod surface;
pub mod transform;

pub use canvas::Canvas;
pub use color::Color;
pub use config::{DEFAULT_TEXTURE_SIZE, FilterConfig};
pub use error::{Error, Result};
pub use pixel::{CHANNELS, clamp_u8};
pub use surface::{Surface, byte_len};
pub use transform::BlendTransform;
