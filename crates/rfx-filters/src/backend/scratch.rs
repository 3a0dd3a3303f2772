//! Reusable off-screen surfaces for the CPU backend.
//!
//! Slots are created lazily and resized on demand. Resizing clears a surface;
//! reusing one at the same size does not, so a filter that relies on
//! transparent pixels clears the surface itself.

use rfx_core::Surface;

/// Named scratch surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScratchSlot {
    /// Horizontal blur output.
    BlurLayer1,
    /// Vertical blur output.
    BlurLayer2,
    /// Intermediate surface for half-step downscaling.
    SliceByTwo,
    /// Placed second image for image blending.
    BlendImage,
}

impl ScratchSlot {
    pub const ALL: [ScratchSlot; 4] = [
        ScratchSlot::BlurLayer1,
        ScratchSlot::BlurLayer2,
        ScratchSlot::SliceByTwo,
        ScratchSlot::BlendImage,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Pool of scratch surfaces owned by a CPU backend.
#[derive(Debug, Default)]
pub struct ScratchPool {
    slots: [Option<Surface>; 4],
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface in `slot`, sized to `width x height`.
    pub fn surface(&mut self, slot: ScratchSlot, width: u32, height: u32) -> &mut Surface {
        let entry = &mut self.slots[slot.index()];
        let surface = entry.get_or_insert_with(|| Surface::new(width, height));
        if surface.dimensions() != (width, height) {
            surface.set_size(width, height);
        }
        surface
    }

    /// Move the surface out of `slot`, sized to `width x height`.
    ///
    /// Pair with [`ScratchPool::put`] to hand it back.
    pub fn take(&mut self, slot: ScratchSlot, width: u32, height: u32) -> Surface {
        let mut surface = self.slots[slot.index()]
            .take()
            .unwrap_or_else(|| Surface::new(width, height));
        if surface.dimensions() != (width, height) {
            surface.set_size(width, height);
        }
        surface
    }

    /// Store `surface` in `slot`.
    pub fn put(&mut self, slot: ScratchSlot, surface: Surface) {
        self.slots[slot.index()] = Some(surface);
    }

    pub fn is_allocated(&self, slot: ScratchSlot) -> bool {
        self.slots[slot.index()].is_some()
    }

    /// Drop every surface.
    pub fn release(&mut self) {
        self.slots = Default::default();
    }
}
