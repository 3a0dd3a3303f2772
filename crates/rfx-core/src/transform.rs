//! 2D affine transform used to place a blended image over a target.

use serde::{Deserialize, Serialize};

/// Affine matrix `[a, b, c, d, e, f]` mapping `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendTransform(pub [f64; 6]);

impl BlendTransform {
    pub const fn identity() -> Self {
        Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    }

    /// Scale then translate, the placement of an image object at `(left, top)`.
    pub const fn placement(scale_x: f64, scale_y: f64, left: f64, top: f64) -> Self {
        Self([scale_x, 0.0, 0.0, scale_y, left, top])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Transform a point.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Inverse transform, `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Self> {
        let [a, b, c, d, e, f] = self.0;
        let det = a * d - b * c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Self([
            d * inv,
            -b * inv,
            -c * inv,
            a * inv,
            (c * f - d * e) * inv,
            (b * e - a * f) * inv,
        ]))
    }
}

impl Default for BlendTransform {
    fn default() -> Self {
        Self::identity()
    }
}
