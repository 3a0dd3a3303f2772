//! Destination canvas.
//!
//! A canvas owns its size and, usually, a 2D context backed by a [`Surface`].
//! A canvas created with [`Canvas::without_context`] has no context; the
//! filter backends treat that as a recoverable no-op.

use crate::Surface;

/// Filter destination with an optional 2D context.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    context: Option<Surface>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, context: Some(Surface::new(width, height)) }
    }

    /// A canvas whose 2D context cannot be acquired.
    pub fn without_context(width: u32, height: u32) -> Self {
        Self { width, height, context: None }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The 2D context, if one exists.
    pub fn context_2d(&mut self) -> Option<&mut Surface> {
        self.context.as_mut()
    }

    /// Read-only view of the context surface.
    pub fn surface(&self) -> Option<&Surface> {
        self.context.as_ref()
    }

    /// Take the surface out, leaving the canvas without a context.
    pub fn into_surface(self) -> Option<Surface> {
        self.context
    }

    /// Resize the canvas. Clears the context when the size changes.
    pub fn set_size(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        if let Some(ctx) = self.context.as_mut() {
            ctx.set_size(width, height);
        }
    }
}
