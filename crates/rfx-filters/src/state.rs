//! Per-invocation pipeline state threaded through a filter chain.

use rfx_core::Surface;

use crate::backend::scratch::ScratchPool;

#[cfg(feature = "wgpu")]
pub use crate::backend::wgpu_backend::GpuPipelineState;

/// Backend-specific state for one chain invocation.
#[derive(Debug)]
pub enum PipelineState<'a> {
    Cpu(CpuPipelineState<'a>),
    #[cfg(feature = "wgpu")]
    Gpu(GpuPipelineState<'a>),
}

impl<'a> PipelineState<'a> {
    /// Current output dimensions.
    pub fn destination_size(&self) -> (u32, u32) {
        match self {
            PipelineState::Cpu(s) => (s.destination_width, s.destination_height),
            #[cfg(feature = "wgpu")]
            PipelineState::Gpu(s) => (s.destination_width, s.destination_height),
        }
    }

    pub fn is_gpu(&self) -> bool {
        !matches!(self, PipelineState::Cpu(_))
    }

    /// Unwrap the CPU variant.
    pub fn into_cpu(self) -> Option<CpuPipelineState<'a>> {
        match self {
            PipelineState::Cpu(s) => Some(s),
            #[cfg(feature = "wgpu")]
            PipelineState::Gpu(_) => None,
        }
    }

    /// Unwrap the GPU variant.
    #[cfg(feature = "wgpu")]
    pub fn into_gpu(self) -> Option<GpuPipelineState<'a>> {
        match self {
            PipelineState::Gpu(s) => Some(s),
            PipelineState::Cpu(_) => None,
        }
    }
}

/// CPU chain state: the working pixel buffer plus the unfiltered original.
#[derive(Debug)]
pub struct CpuPipelineState<'a> {
    pub source_width: u32,
    pub source_height: u32,
    pub destination_width: u32,
    pub destination_height: u32,
    /// Working buffer, mutated in place or replaced wholesale.
    pub image: Surface,
    /// Unfiltered input.
    pub original: &'a Surface,
    /// Backend-owned reusable surfaces.
    pub resources: &'a mut ScratchPool,
}

impl<'a> CpuPipelineState<'a> {
    pub fn new(image: Surface, original: &'a Surface, resources: &'a mut ScratchPool) -> Self {
        let (w, h) = image.dimensions();
        Self {
            source_width: w,
            source_height: h,
            destination_width: w,
            destination_height: h,
            image,
            original,
            resources,
        }
    }

    /// Swap in a new working buffer, returning the old one.
    ///
    /// Destination dimensions follow the new buffer.
    pub fn replace_image(&mut self, image: Surface) -> Surface {
        self.destination_width = image.width();
        self.destination_height = image.height();
        std::mem::replace(&mut self.image, image)
    }
}
