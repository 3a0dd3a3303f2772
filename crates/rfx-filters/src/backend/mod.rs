//! Filter backends and backend selection.
//!
//! ```text
//! FilterBackend
//!     +-- CpuBackend  (pixel buffers + scratch pool)
//!     +-- WgpuBackend (fragment shaders + program/texture caches)
//! ```
//!
//! The process-wide backend is chosen once from the capability probe and
//! [`FilterConfig`], then reused until [`reset_filter_backend`] is called.

pub mod cache;
pub mod cpu_backend;
pub mod detect;
pub mod scratch;

#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

use std::sync::{Mutex, PoisonError};

use rfx_core::{Canvas, FilterConfig, Surface};
use tracing::{info, warn};

pub use cache::{CacheStats, ResourceCache};
pub use cpu_backend::CpuBackend;
pub use detect::{BackendInfo, Capabilities, Precision, capabilities, describe_backends, detect_backends};
pub use scratch::{ScratchPool, ScratchSlot};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{CopyStrategy, GpuContext, WgpuBackend};

use crate::{Filter, FilterResult};

/// Backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Pick from the probe and configuration.
    #[default]
    Auto,
    /// Pixel buffers on the CPU.
    Cpu,
    /// Fragment shaders via wgpu.
    Wgpu,
}

impl BackendKind {
    /// Check if this backend is usable on the current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto | Self::Cpu => true,
            #[cfg(feature = "wgpu")]
            Self::Wgpu => capabilities().gpu_available,
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Wgpu => "wgpu",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(format!("unknown backend '{other}' (expected auto, cpu or wgpu)")),
        }
    }
}

/// GPU is chosen only when enabled by configuration and the device supports
/// textures at least as large as the configured tile size.
pub fn select_backend_kind(config: &FilterConfig, caps: &Capabilities) -> BackendKind {
    if config.enable_gpu_filtering && caps.gpu_available && caps.max_texture_size >= config.texture_size {
        BackendKind::Wgpu
    } else {
        BackendKind::Cpu
    }
}

/// Result of a chain run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOutput {
    /// Final destination width.
    pub width: u32,
    /// Final destination height.
    pub height: u32,
    /// Backend that ran the chain.
    pub backend: BackendKind,
}

// =============================================================================
// FilterBackend
// =============================================================================

/// A constructed backend.
#[derive(Debug)]
pub enum FilterBackend {
    Cpu(CpuBackend),
    #[cfg(feature = "wgpu")]
    Wgpu(WgpuBackend),
}

impl FilterBackend {
    /// Select and construct a backend from the probe and `config`.
    ///
    /// Falls back to the CPU when the GPU backend cannot be built.
    pub fn new(config: &FilterConfig) -> Self {
        Self::with_kind(BackendKind::Auto, config)
    }

    /// Construct a specific backend. `Auto` selects from the probe.
    pub fn with_kind(kind: BackendKind, config: &FilterConfig) -> Self {
        let kind = match kind {
            BackendKind::Auto => select_backend_kind(config, capabilities()),
            k => k,
        };
        let backend = match kind {
            #[cfg(feature = "wgpu")]
            BackendKind::Wgpu => match WgpuBackend::new(config) {
                Ok(b) => FilterBackend::Wgpu(b),
                Err(e) => {
                    warn!(error = %e, "wgpu backend unavailable, using CPU");
                    FilterBackend::Cpu(CpuBackend::new())
                }
            },
            #[cfg(not(feature = "wgpu"))]
            BackendKind::Wgpu => {
                warn!("built without the wgpu feature, using CPU");
                FilterBackend::Cpu(CpuBackend::new())
            }
            _ => FilterBackend::Cpu(CpuBackend::new()),
        };
        info!(backend = backend.kind().name(), "filter backend ready");
        backend
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            FilterBackend::Cpu(_) => BackendKind::Cpu,
            #[cfg(feature = "wgpu")]
            FilterBackend::Wgpu(_) => BackendKind::Wgpu,
        }
    }

    /// Run `filters` over `source` scaled to `width x height`, writing the
    /// result into `destination`.
    ///
    /// Returns `Ok(None)` when the destination has no 2D context. When
    /// `_cache_key` is given the GPU backend keeps the uploaded source in its
    /// texture cache under that key.
    pub fn apply_filters(
        &mut self,
        filters: &[&dyn Filter],
        source: &Surface,
        width: u32,
        height: u32,
        destination: &mut Canvas,
        _cache_key: Option<&str>,
    ) -> FilterResult<Option<FilterOutput>> {
        match self {
            FilterBackend::Cpu(b) => b.apply_filters(filters, source, width, height, destination),
            #[cfg(feature = "wgpu")]
            FilterBackend::Wgpu(b) => b.apply_filters(filters, source, width, height, destination, _cache_key),
        }
    }

    /// Drop cached GPU resources stored under `key`.
    #[cfg_attr(not(feature = "wgpu"), allow(unused_variables))]
    pub fn evict_caches_for_key(&mut self, key: &str) {
        match self {
            FilterBackend::Cpu(_) => {}
            #[cfg(feature = "wgpu")]
            FilterBackend::Wgpu(b) => b.evict_caches_for_key(key),
        }
    }

    /// Release every cache and scratch resource; GPU backends also drop the device.
    pub fn dispose(&mut self) {
        match self {
            FilterBackend::Cpu(b) => b.dispose(),
            #[cfg(feature = "wgpu")]
            FilterBackend::Wgpu(b) => b.dispose(),
        }
    }
}

// =============================================================================
// Process-wide backend
// =============================================================================

static BACKEND: Mutex<Option<FilterBackend>> = Mutex::new(None);

/// Run `f` with the process-wide backend, creating it on first use.
pub fn with_filter_backend<R>(f: impl FnOnce(&mut FilterBackend) -> R) -> R {
    let mut guard = BACKEND.lock().unwrap_or_else(PoisonError::into_inner);
    let backend = guard.get_or_insert_with(|| FilterBackend::new(FilterConfig::global()));
    f(backend)
}

/// Dispose the process-wide backend; the next use selects again.
pub fn reset_filter_backend() {
    let mut guard = BACKEND.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mut backend) = guard.take() {
        backend.dispose();
    }
}

/// Filters that would change pixels, in order.
pub fn active_filters<'a>(filters: &'a [Box<dyn Filter>]) -> Vec<&'a dyn Filter> {
    filters.iter().map(|f| f.as_ref()).filter(|f| !f.is_neutral_state()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu_caps(max: u32) -> Capabilities {
        Capabilities { gpu_available: true, max_texture_size: max, precision: Some(Precision::High), adapter: None }
    }

    #[test]
    fn test_select_gpu_when_large_enough() {
        let config = FilterConfig::default();
        assert_eq!(select_backend_kind(&config, &gpu_caps(4096)), BackendKind::Wgpu);
        assert_eq!(select_backend_kind(&config, &gpu_caps(2048)), BackendKind::Wgpu);
    }

    #[test]
    fn test_select_cpu_when_texture_too_small() {
        let config = FilterConfig::default();
        assert_eq!(select_backend_kind(&config, &gpu_caps(1024)), BackendKind::Cpu);
    }

    #[test]
    fn test_select_cpu_when_disabled_or_missing() {
        let disabled = FilterConfig { enable_gpu_filtering: false, ..Default::default() };
        assert_eq!(select_backend_kind(&disabled, &gpu_caps(8192)), BackendKind::Cpu);
        assert_eq!(select_backend_kind(&FilterConfig::default(), &Capabilities::cpu_only()), BackendKind::Cpu);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("CPU".parse::<BackendKind>().unwrap(), BackendKind::Cpu);
        assert_eq!("gpu".parse::<BackendKind>().unwrap(), BackendKind::Wgpu);
        assert!("metal".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_explicit_cpu_backend() {
        let backend = FilterBackend::with_kind(BackendKind::Cpu, &FilterConfig::default());
        assert_eq!(backend.kind(), BackendKind::Cpu);
    }

    #[test]
    fn test_cpu_backend_ignores_cache_key() {
        let mut backend = FilterBackend::with_kind(BackendKind::Cpu, &FilterConfig::default());
        let source = Surface::filled(3, 2, [10, 20, 30, 255]);
        let mut a = Canvas::new(3, 2);
        let mut b = Canvas::new(3, 2);
        let chain: [&dyn Filter; 0] = [];
        backend.apply_filters(&chain, &source, 3, 2, &mut a, Some("img")).unwrap();
        backend.evict_caches_for_key("img");
        backend.apply_filters(&chain, &source, 3, 2, &mut b, None).unwrap();
        assert_eq!(a.into_surface(), b.into_surface());
    }
}
