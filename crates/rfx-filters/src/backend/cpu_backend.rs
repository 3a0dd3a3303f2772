//! CPU filter backend.
//!
//! Draws the source into the destination context once, keeps an immutable
//! copy of those pixels as the chain's original, runs every filter over a
//! working copy, then writes the result back. When the final buffer's size
//! differs from the input (resampling), the destination is resized first.

use rfx_core::{Canvas, Error as CoreError, Surface};
use tracing::{debug, trace, warn};

use super::scratch::ScratchPool;
use super::{BackendKind, FilterOutput};
use crate::state::{CpuPipelineState, PipelineState};
use crate::{Filter, FilterError, FilterResult};

/// Pixel-buffer backend.
#[derive(Debug, Default)]
pub struct CpuBackend {
    resources: ScratchPool,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch surfaces shared by every chain this backend runs.
    pub fn resources(&self) -> &ScratchPool {
        &self.resources
    }

    /// See [`super::FilterBackend::apply_filters`].
    pub fn apply_filters(
        &mut self,
        filters: &[&dyn Filter],
        source: &Surface,
        width: u32,
        height: u32,
        destination: &mut Canvas,
    ) -> FilterResult<Option<FilterOutput>> {
        if width == 0 || height == 0 {
            return Err(FilterError::Core(CoreError::InvalidDimensions { width, height }));
        }
        if destination.context_2d().is_none() {
            warn!("destination canvas has no 2D context, skipping filters");
            return Ok(None);
        }

        destination.set_size(width, height);
        let Some(ctx) = destination.context_2d() else {
            return Ok(None);
        };
        ctx.clear();
        ctx.draw_image(source, width, height);
        let image = Surface::from_rgba(width, height, ctx.get_image_data(width, height))?;
        let original = image.clone();

        debug!(filters = filters.len(), width, height, "cpu chain");
        let mut state = PipelineState::Cpu(CpuPipelineState::new(image, &original, &mut self.resources));
        for filter in filters {
            trace!(filter = filter.filter_type(), "apply");
            filter.apply_to(&mut state)?;
        }

        let state = state
            .into_cpu()
            .ok_or_else(|| FilterError::BackendNotAvailable("cpu chain produced a gpu state".into()))?;
        let (out_w, out_h) = state.image.dimensions();
        destination.set_size(out_w, out_h);
        if let Some(ctx) = destination.context_2d() {
            ctx.put_image_data(state.image.data(), out_w, out_h)?;
        }

        Ok(Some(FilterOutput { width: out_w, height: out_h, backend: BackendKind::Cpu }))
    }

    /// Release scratch surfaces.
    pub fn dispose(&mut self) {
        self.resources.release();
    }
}
