//! Dual-backend image filter pipeline.
//!
//! Runs chains of image filters on the GPU (wgpu fragment shaders, feature
//! `wgpu`) or on CPU pixel buffers (rayon), chosen once per process from a
//! capability probe and [`FilterConfig`](rfx_core::FilterConfig).
//!
//! # Architecture
//!
//! ```text
//! FilterBackend (selected once, process-wide)
//!     ├── CpuBackend  ── CpuPipelineState ── ScratchPool
//!     └── WgpuBackend ── GpuPipelineState ── program cache + texture cache
//!
//! Filter (one impl per filter, both backends)
//!     ├── apply_cpu        pixel buffer path
//!     └── fragment_shader  WGSL + send_uniform_data per PassInfo
//!
//! FilterRegistry: { "type": tag, ... } records <-> Box<dyn Filter>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rfx_core::{Canvas, Surface};
//! use rfx_filters::{Filter, filters::{Brightness, Blur}, backend::with_filter_backend};
//!
//! let source = Surface::filled(64, 64, [200, 100, 50, 255]);
//! let mut canvas = Canvas::new(64, 64);
//! let chain: [&dyn Filter; 2] = [&Brightness::new(0.1), &Blur::new(0.2)];
//! let out = with_filter_backend(|b| b.apply_filters(&chain, &source, 64, 64, &mut canvas, None))?;
//! ```

pub mod backend;
pub mod error;
pub mod filter;
pub mod filters;
pub mod registry;
pub mod shaders;
pub mod state;

pub use backend::{
    BackendKind, FilterBackend, FilterOutput, active_filters, reset_filter_backend, select_backend_kind,
    with_filter_backend,
};
pub use error::{FilterError, FilterResult};
pub use filter::{Filter, MainParameter, PassInfo, SecondarySource, UniformBlock};
pub use registry::{AbortSignal, FilterRegistry, LoadOptions, MemorySourceLoader, SourceLoader};
pub use state::{CpuPipelineState, PipelineState};
