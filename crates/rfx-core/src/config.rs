//! Filter engine configuration.
//!
//! Read once when a backend is constructed. Defaults can be overridden from
//! the environment or deserialized from a JSON document.
//!
//! # Environment Variables
//!
//! - `RFX_ENABLE_GPU` - Enable GPU filtering ("0"/"false" disables)
//! - `RFX_TEXTURE_SIZE` - Tile/texture size the GPU must support
//! - `RFX_FORCE_PUT_IMAGE_DATA` - Always copy GPU output with raw pixel readback

use std::env;
use std::sync::OnceLock;

use serde::Deserialize;

/// Default tile size in pixels.
pub const DEFAULT_TEXTURE_SIZE: u32 = 2048;

/// Backend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Allow the GPU backend to be selected.
    pub enable_gpu_filtering: bool,
    /// Tile size the GPU must support for selection.
    pub texture_size: u32,
    /// Skip the copy-strategy benchmark and always use raw readback.
    pub force_put_image_data: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enable_gpu_filtering: true,
            texture_size: DEFAULT_TEXTURE_SIZE,
            force_put_image_data: false,
        }
    }
}

impl FilterConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `RFX_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_bool("RFX_ENABLE_GPU") {
            self.enable_gpu_filtering = v;
        }
        if let Some(v) = env::var("RFX_TEXTURE_SIZE").ok().and_then(|s| s.trim().parse().ok()) {
            self.texture_size = v;
        }
        if let Some(v) = env_bool("RFX_FORCE_PUT_IMAGE_DATA") {
            self.force_put_image_data = v;
        }
        self
    }

    /// Process-wide configuration, resolved from the environment on first use.
    pub fn global() -> &'static FilterConfig {
        static CONFIG: OnceLock<FilterConfig> = OnceLock::new();
        CONFIG.get_or_init(FilterConfig::from_env)
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let v = env::var(key).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
