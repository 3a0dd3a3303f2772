//! Resampling.
//!
//! The CPU path offers four algorithms. The GPU path always runs two
//! separable passes (width, then height) of a Lanczos tap filter whose
//! window depends on the scale of the pass.

use std::borrow::Cow;
use std::collections::HashMap;
use std::f64::consts::PI;

use rfx_core::{CHANNELS, Surface, clamp_u8};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_record, map_rows, to_record};
use crate::backend::{ScratchPool, ScratchSlot};
use crate::filter::{PassInfo, UNIFORM_FLOATS, UniformBlock};
use crate::state::CpuPipelineState;
use crate::{Filter, FilterError, FilterResult, shaders};

/// Largest tap window the parameter uniform holds after the step vector.
const MAX_WINDOW: u32 = (UNIFORM_FLOATS - 2) as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResizeType {
    Bilinear,
    /// Weighted-area filter.
    #[default]
    Hermite,
    /// Windowed sinc with `lanczos_lobes` lobes.
    Lanczos,
    /// Repeated halving, then one final step to the target size.
    SliceHack,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Resize {
    pub resize_type: ResizeType,
    pub scale_x: f64,
    pub scale_y: f64,
    pub lanczos_lobes: u32,
}

impl Default for Resize {
    fn default() -> Self {
        Self { resize_type: ResizeType::Hermite, scale_x: 1.0, scale_y: 1.0, lanczos_lobes: 3 }
    }
}

impl Resize {
    pub const TYPE: &'static str = "Resize";

    pub fn new(resize_type: ResizeType, scale_x: f64, scale_y: f64) -> FilterResult<Self> {
        let f = Self { resize_type, scale_x, scale_y, ..Default::default() };
        f.validate()?;
        Ok(f)
    }

    pub fn with_lobes(mut self, lobes: u32) -> Self {
        self.lanczos_lobes = lobes;
        self
    }

    pub(crate) fn from_object(record: &Value) -> FilterResult<Self> {
        let f: Self = from_record(Self::TYPE, record)?;
        f.validate()?;
        Ok(f)
    }

    fn validate(&self) -> FilterResult<()> {
        for (name, s) in [("scaleX", self.scale_x), ("scaleY", self.scale_y)] {
            if !(s.is_finite() && s > 0.0) {
                return Err(FilterError::invalid(Self::TYPE, format!("{name} must be positive, got {s}")));
            }
        }
        if self.lanczos_lobes == 0 {
            return Err(FilterError::invalid(Self::TYPE, "lanczosLobes must be at least 1"));
        }
        Ok(())
    }

    /// Output dimensions for a `width x height` input.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        let dw = (width as f64 * self.scale_x).round().max(1.0) as u32;
        let dh = (height as f64 * self.scale_y).round().max(1.0) as u32;
        (dw, dh)
    }

    /// Tap window for a pass scaling by `scale`.
    pub fn filter_window(&self, scale: f64) -> u32 {
        ((self.lanczos_lobes as f64 / scale).ceil() as u32).clamp(1, MAX_WINDOW)
    }

    /// Lanczos weights at offsets `1..=window`, in source texels.
    fn taps(&self, scale: f64) -> Vec<f64> {
        let kernel = lanczos_kernel(self.lanczos_lobes as f64);
        (1..=self.filter_window(scale)).map(|i| kernel(i as f64 * scale)).collect()
    }

    fn pass_scale(pass: &PassInfo) -> f64 {
        if pass.horizontal {
            pass.dest_width as f64 / pass.source_width.max(1) as f64
        } else {
            pass.dest_height as f64 / pass.source_height.max(1) as f64
        }
    }
}

impl Filter for Resize {
    fn filter_type(&self) -> &'static str {
        Self::TYPE
    }

    fn is_neutral_state(&self) -> bool {
        self.scale_x == 1.0 && self.scale_y == 1.0
    }

    fn cache_key(&self) -> String {
        format!("{}_{}", Self::TYPE, self.filter_window(self.scale_x))
    }

    fn to_object(&self) -> Value {
        to_record(Self::TYPE, self)
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        self.validate()?;
        if self.is_neutral_state() {
            return Ok(());
        }
        let (w, h) = state.image.dimensions();
        let (dw, dh) = self.output_size(w, h);
        let out = match self.resize_type {
            ResizeType::Bilinear => bilinear(&state.image, dw, dh),
            ResizeType::Hermite => hermite(&state.image, dw, dh),
            ResizeType::Lanczos => lanczos(&state.image, dw, dh, self.lanczos_lobes as f64),
            ResizeType::SliceHack => slice_by_two(&state.image, state.resources, dw, dh),
        };
        state.replace_image(out);
        Ok(())
    }

    fn gpu_pass_count(&self) -> u32 {
        2
    }

    fn plan_passes(&self, width: u32, height: u32) -> Vec<PassInfo> {
        let (dw, dh) = self.output_size(width, height);
        vec![
            PassInfo {
                index: 0,
                horizontal: true,
                source_width: width,
                source_height: height,
                dest_width: dw,
                dest_height: height,
            },
            PassInfo {
                index: 1,
                horizontal: false,
                source_width: dw,
                source_height: height,
                dest_width: dw,
                dest_height: dh,
            },
        ]
    }

    fn shader_key(&self, pass: &PassInfo) -> String {
        format!("{}_{}", Self::TYPE, self.filter_window(Self::pass_scale(pass)))
    }

    fn fragment_shader(&self, pass: &PassInfo) -> Cow<'static, str> {
        Cow::Owned(shaders::resize(self.filter_window(Self::pass_scale(pass))))
    }

    fn send_uniform_data(&self, pass: &PassInfo, uniforms: &mut UniformBlock) {
        if pass.horizontal {
            uniforms.push(1.0 / pass.source_width.max(1) as f32);
            uniforms.push(0.0);
        } else {
            uniforms.push(0.0);
            uniforms.push(1.0 / pass.source_height.max(1) as f32);
        }
        for t in self.taps(Self::pass_scale(pass)) {
            uniforms.push(t as f32);
        }
    }
}

// =============================================================================
// CPU algorithms
// =============================================================================

fn lanczos_kernel(lobes: f64) -> impl Fn(f64) -> f64 {
    move |x: f64| {
        if x >= lobes || x <= -lobes {
            return 0.0;
        }
        if x.abs() < 1.192_092_9e-7 {
            return 1.0;
        }
        let x = x * PI;
        let xx = x / lobes;
        (x.sin() / x) * xx.sin() / xx
    }
}

fn bilinear(src: &Surface, dw: u32, dh: u32) -> Surface {
    let (ow, oh) = src.dimensions();
    let ratio_x = ow as f64 / dw as f64;
    let ratio_y = oh as f64 / dh as f64;
    let mut out = Surface::new(dw, dh);
    map_rows(out.data_mut(), dw, |i, row| {
        let sy = ratio_y * i as f64;
        let y = (sy.floor() as u32).min(oh - 1);
        let y_diff = sy - y as f64;
        let y1 = (y + 1).min(oh - 1);
        for j in 0..dw as usize {
            let sx = ratio_x * j as f64;
            let x = (sx.floor() as u32).min(ow - 1);
            let x_diff = sx - x as f64;
            let x1 = (x + 1).min(ow - 1);
            let (a, b, c, d) = (src.pixel(x, y), src.pixel(x1, y), src.pixel(x, y1), src.pixel(x1, y1));
            for ch in 0..CHANNELS {
                let v = a[ch] as f64 * (1.0 - x_diff) * (1.0 - y_diff)
                    + b[ch] as f64 * x_diff * (1.0 - y_diff)
                    + c[ch] as f64 * y_diff * (1.0 - x_diff)
                    + d[ch] as f64 * x_diff * y_diff;
                row[j * CHANNELS + ch] = clamp_u8(v);
            }
        }
    });
    out
}

fn hermite(src: &Surface, dw: u32, dh: u32) -> Surface {
    let (ow, oh) = src.dimensions();
    let ratio_w = ow as f64 / dw as f64;
    let ratio_h = oh as f64 / dh as f64;
    let half_w = (ratio_w / 2.0).ceil();
    let half_h = (ratio_h / 2.0).ceil();
    let mut out = Surface::new(dw, dh);
    map_rows(out.data_mut(), dw, |j, row| {
        let center_y = (j as f64 + 0.5) * ratio_h;
        let y_end = ((j + 1) as f64 * ratio_h).min(oh as f64);
        for i in 0..dw as usize {
            let center_x = (i as f64 + 0.5) * ratio_w;
            let x_end = ((i + 1) as f64 * ratio_w).min(ow as f64);
            let (mut weights, mut weights_alpha) = (0.0, 0.0);
            let mut gx = [0.0f64; 4];

            let mut yy = (j as f64 * ratio_h).floor() as u32;
            while (yy as f64) < y_end {
                let dy = (center_y - (yy as f64 + 0.5)).abs() / half_h;
                let w0 = dy * dy;
                let mut xx = (i as f64 * ratio_w).floor() as u32;
                while (xx as f64) < x_end {
                    let dx = (center_x - (xx as f64 + 0.5)).abs() / half_w;
                    let w = (w0 + dx * dx).sqrt();
                    xx += 1;
                    if w > 1.0 {
                        continue;
                    }
                    let mut weight = 2.0 * w * w * w - 3.0 * w * w + 1.0;
                    if weight <= 0.0 {
                        continue;
                    }
                    let p = src.pixel(xx - 1, yy);
                    gx[3] += weight * p[3] as f64;
                    weights_alpha += weight;
                    if p[3] < 255 {
                        weight = weight * p[3] as f64 / 255.0;
                    }
                    gx[0] += weight * p[0] as f64;
                    gx[1] += weight * p[1] as f64;
                    gx[2] += weight * p[2] as f64;
                    weights += weight;
                }
                yy += 1;
            }

            let o = i * CHANNELS;
            if weights > 0.0 {
                for c in 0..3 {
                    row[o + c] = clamp_u8(gx[c] / weights);
                }
            }
            if weights_alpha > 0.0 {
                row[o + 3] = clamp_u8(gx[3] / weights_alpha);
            }
        }
    });
    out
}

/// Lanczos resampling with weights memoized by quantized distance for the
/// duration of one call.
fn lanczos(src: &Surface, dw: u32, dh: u32, lobes: f64) -> Surface {
    let (ow, oh) = src.dimensions();
    let ratio_x = ow as f64 / dw as f64;
    let ratio_y = oh as f64 / dh as f64;
    // upscaling keeps the unscaled kernel
    let kx = ratio_x.max(1.0);
    let ky = ratio_y.max(1.0);
    let rcp_x = 1.0 / kx;
    let rcp_y = 1.0 / ky;
    let range_x = (kx * lobes).ceil() as i64;
    let range_y = (ky * lobes).ceil() as i64;
    let kernel = lanczos_kernel(lobes);
    let mut cache: HashMap<(u32, u32), f64> = HashMap::new();

    let mut out = Surface::new(dw, dh);
    for u in 0..dw {
        let cx = (u as f64 + 0.5) * ratio_x;
        let icx = cx.floor() as i64;
        for v in 0..dh {
            let cy = (v as f64 + 0.5) * ratio_y;
            let icy = cy.floor() as i64;
            let mut acc = [0.0f64; 4];
            let mut total = 0.0;
            for i in (icx - range_x)..=(icx + range_x) {
                if i < 0 || i >= ow as i64 {
                    continue;
                }
                let fx = (1000.0 * (i as f64 + 0.5 - cx).abs()).floor() as u32;
                for j in (icy - range_y)..=(icy + range_y) {
                    if j < 0 || j >= oh as i64 {
                        continue;
                    }
                    let fy = (1000.0 * (j as f64 + 0.5 - cy).abs()).floor() as u32;
                    let weight = *cache.entry((fx, fy)).or_insert_with(|| {
                        let d = ((fx as f64 * rcp_x).powi(2) + (fy as f64 * rcp_y).powi(2)).sqrt();
                        kernel(d / 1000.0)
                    });
                    if weight > 0.0 {
                        let p = src.pixel(i as u32, j as u32);
                        for c in 0..CHANNELS {
                            acc[c] += weight * p[c] as f64;
                        }
                        total += weight;
                    }
                }
            }
            if total > 0.0 {
                out.set_pixel(u, v, acc.map(|a| clamp_u8(a / total)));
            }
        }
    }
    out
}

/// Halve through the scratch surface until one more halving would pass the
/// target, then step to the exact size.
fn slice_by_two(src: &Surface, pool: &mut ScratchPool, dw: u32, dh: u32) -> Surface {
    let (mut w, mut h) = src.dimensions();
    let mut current = src.clone();
    let (mut done_w, mut done_h) = (false, false);
    while !done_w || !done_h {
        if !done_w {
            if w / 2 > dw {
                w /= 2;
            } else {
                w = dw;
                done_w = true;
            }
        }
        if !done_h {
            if h / 2 > dh {
                h /= 2;
            } else {
                h = dh;
                done_h = true;
            }
        }
        let scratch = pool.surface(ScratchSlot::SliceByTwo, w, h);
        scratch.clear();
        scratch.draw_image(&current, w, h);
        current = scratch.clone();
    }
    current
}
