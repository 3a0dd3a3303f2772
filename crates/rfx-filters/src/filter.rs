//! The filter contract.
//!
//! Every filter is one [`Filter`] implementation shared by both backends. The
//! CPU path calls [`Filter::apply_cpu`]; the GPU path plans one or more
//! [`PassInfo`]s and, for each, asks the filter for its fragment shader and
//! packed uniforms. Per-pass values (direction, intermediate dimensions,
//! coefficients) travel in the `PassInfo`, so filter instances are never
//! mutated while they run and can be shared across threads.

use std::borrow::Cow;
use std::fmt;

use rfx_core::Surface;
use serde_json::Value;

use crate::FilterResult;
use crate::state::{CpuPipelineState, PipelineState};

/// Number of `vec4<f32>` slots in the per-pass parameter uniform.
pub const UNIFORM_VEC4S: usize = 64;

/// Capacity of [`UniformBlock`] in floats.
pub const UNIFORM_FLOATS: usize = UNIFORM_VEC4S * 4;

// =============================================================================
// Filter trait
// =============================================================================

/// An image operation that runs on either backend.
pub trait Filter: fmt::Debug + Send + Sync {
    /// Stable type tag, used for serialization and as the default cache key.
    fn filter_type(&self) -> &'static str;

    /// True when the current parameters leave every pixel unchanged.
    fn is_neutral_state(&self) -> bool;

    /// Program cache key. Filters whose shader text depends on a parameter
    /// fold that parameter in.
    fn cache_key(&self) -> String {
        self.filter_type().to_string()
    }

    /// `{ "type": tag, ...params }` record.
    fn to_object(&self) -> Value;

    /// Run on the CPU pixel buffer.
    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()>;

    /// Dispatch on the pipeline state variant.
    ///
    /// On the GPU this plans the passes, and for each pass sets up the
    /// framebuffer target, draws with the filter's program and swaps
    /// source and target.
    fn apply_to(&self, state: &mut PipelineState<'_>) -> FilterResult<()> {
        match state {
            PipelineState::Cpu(cpu) => self.apply_cpu(cpu),
            #[cfg(feature = "wgpu")]
            PipelineState::Gpu(gpu) => gpu.run_filter(self),
        }
    }

    /// Framebuffer passes this filter consumes on the GPU.
    fn gpu_pass_count(&self) -> u32 {
        1
    }

    /// Pass plan for a `width x height` input.
    ///
    /// Single-pass filters keep their dimensions; two-pass filters run a
    /// horizontal then a vertical pass.
    fn plan_passes(&self, width: u32, height: u32) -> Vec<PassInfo> {
        match self.gpu_pass_count() {
            0 | 1 => vec![PassInfo::single(width, height)],
            n => (0..n).map(|i| PassInfo::separable(i, width, height)).collect(),
        }
    }

    /// Program cache key for one pass.
    fn shader_key(&self, _pass: &PassInfo) -> String {
        self.cache_key()
    }

    /// WGSL fragment stage (`fs_main`) appended to the shared prelude.
    fn fragment_shader(&self, pass: &PassInfo) -> Cow<'static, str>;

    /// Pack parameters into the pass uniform block.
    fn send_uniform_data(&self, _pass: &PassInfo, _uniforms: &mut UniformBlock) {}

    /// Extra texture bound to the secondary slot for this filter's draws.
    fn secondary_source(&self) -> Option<SecondarySource<'_>> {
        None
    }
}

// =============================================================================
// Main parameter helper
// =============================================================================

/// Opt-in neutrality check for filters driven by one parameter.
///
/// Works for scalars and arrays alike, anything with `PartialEq`.
pub trait MainParameter {
    type Value: PartialEq;

    /// Current value of the driving parameter.
    fn main_parameter(&self) -> Self::Value;

    /// Value at which the filter is a no-op.
    fn neutral_value() -> Self::Value;

    fn main_parameter_is_neutral(&self) -> bool {
        self.main_parameter() == Self::neutral_value()
    }
}

// =============================================================================
// Per-pass context
// =============================================================================

/// One GPU framebuffer round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassInfo {
    /// Zero-based pass index within the filter.
    pub index: u32,
    /// Direction of a separable pass.
    pub horizontal: bool,
    pub source_width: u32,
    pub source_height: u32,
    pub dest_width: u32,
    pub dest_height: u32,
}

impl PassInfo {
    pub fn single(width: u32, height: u32) -> Self {
        Self {
            index: 0,
            horizontal: true,
            source_width: width,
            source_height: height,
            dest_width: width,
            dest_height: height,
        }
    }

    /// Pass `index` of a same-size separable filter; even passes are horizontal.
    pub fn separable(index: u32, width: u32, height: u32) -> Self {
        Self { index, horizontal: index % 2 == 0, ..Self::single(width, height) }
    }

    /// Width over height of the pass input.
    pub fn aspect_ratio(&self) -> f64 {
        self.source_width as f64 / self.source_height.max(1) as f64
    }
}

/// Packed `array<vec4<f32>, 64>` parameter uniform.
///
/// Values are appended in order; shaders read them back with `u_param(i)`.
#[derive(Clone)]
pub struct UniformBlock {
    data: [[f32; 4]; UNIFORM_VEC4S],
    len: usize,
}

impl UniformBlock {
    pub fn new() -> Self {
        Self { data: [[0.0; 4]; UNIFORM_VEC4S], len: 0 }
    }

    /// Append one float. Values past capacity are dropped.
    pub fn push(&mut self, value: f32) {
        if self.len < UNIFORM_FLOATS {
            self.data[self.len / 4][self.len % 4] = value;
            self.len += 1;
        }
    }

    pub fn push_slice(&mut self, values: &[f32]) {
        for &v in values {
            self.push(v);
        }
    }

    /// Floats written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value at float index `i`.
    pub fn get(&self, i: usize) -> f32 {
        self.data[i / 4][i % 4]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UniformBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<f32> = (0..self.len).map(|i| self.get(i)).collect();
        f.debug_tuple("UniformBlock").field(&values).finish()
    }
}

/// Extra texture for secondary-source filters, cached by `key`.
#[derive(Debug, Clone, Copy)]
pub struct SecondarySource<'a> {
    pub key: &'a str,
    pub surface: &'a Surface,
}
