//! WGSL sources for the filter programs.
//!
//! Every program is [`PRELUDE`] (bindings, helpers and the fullscreen
//! triangle vertex stage) followed by a filter's `fs_main`. Filters whose
//! shader text depends on a parameter build it with the generators below.
//!
//! Bindings:
//!
//! | binding | resource |
//! |---|---|
//! | 0 | source texture |
//! | 1 | linear clamp-to-edge sampler |
//! | 2 | `u_params`, 64 x `vec4<f32>` filter parameters |
//! | 3 | `u_step`, `(1/w, 1/h, w, h)` of the pass input |
//! | 4 | secondary texture (1x1 transparent when unused) |
//! | 5 | original unfiltered texture |

use crate::backend::Precision;

/// Shared bindings, helpers and vertex stage.
pub const PRELUDE: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

struct Params {
    v: array<vec4<f32>, 64>,
}

@group(0) @binding(0) var u_texture: texture_2d<f32>;
@group(0) @binding(1) var u_sampler: sampler;
@group(0) @binding(2) var<uniform> u_params: Params;
@group(0) @binding(3) var<uniform> u_step: vec4<f32>;
@group(0) @binding(4) var u_secondary: texture_2d<f32>;
@group(0) @binding(5) var u_original: texture_2d<f32>;

fn u_param(i: u32) -> f32 {
    return u_params.v[i / 4u][i % 4u];
}

fn sample_source(uv: vec2<f32>) -> vec4<f32> {
    return textureSampleLevel(u_texture, u_sampler, uv, 0.0);
}

fn load_source(p: vec2<i32>) -> vec4<f32> {
    return textureLoad(u_texture, p, 0);
}

fn pcg(v: u32) -> u32 {
    let state = v * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let x = f32((index << 1u) & 2u);
    let y = f32(index & 2u);
    var vo: VertexOutput;
    vo.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    vo.uv = vec2<f32>(x, y);
    return vo;
}
"#;

/// Full program source for a fragment stage.
pub fn program_source(fragment: &str) -> String {
    let mut src = String::with_capacity(PRELUDE.len() + fragment.len() + 1);
    src.push_str(PRELUDE);
    src.push('\n');
    src.push_str(fragment);
    src
}

/// Copies the source unchanged.
pub const PASSTHROUGH: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    return sample_source(frag.uv);
}
"#;

/// Trivial fragment stage at `precision`, for the capability probe.
pub fn precision_probe(precision: Precision) -> &'static str {
    match precision {
        Precision::High => {
            r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: f32 = 0.5;
    return vec4<f32>(x);
}
"#
        }
        Precision::Medium => {
            r#"
enable f16;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: f16 = 0.5h;
    return vec4<f32>(f32(x));
}
"#
        }
    }
}

// =============================================================================
// Per-pixel adjustments
// =============================================================================

/// p0: brightness offset.
pub const BRIGHTNESS: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    return vec4<f32>(c.rgb + vec3<f32>(u_param(0u)), c.a);
}
"#;

/// p0: contrast factor.
pub const CONTRAST: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    let mid = vec3<f32>(128.0 / 255.0);
    return vec4<f32>(u_param(0u) * (c.rgb - mid) + mid, c.a);
}
"#;

/// p0: negated saturation.
pub const SATURATION: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    let m = vec3<f32>(max(max(c.r, c.g), c.b));
    let delta = select(vec3<f32>(0.0), (m - c.rgb) * u_param(0u), c.rgb != m);
    return vec4<f32>(c.rgb + delta, c.a);
}
"#;

/// p0: negated vibrance.
pub const VIBRANCE: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    let mx = max(max(c.r, c.g), c.b);
    let avg = (c.r + c.g + c.b) / 3.0;
    let amt = abs(mx - avg) * 2.0 * u_param(0u);
    let m = vec3<f32>(mx);
    let delta = select(vec3<f32>(0.0), (m - c.rgb) * amt, c.rgb != m);
    return vec4<f32>(c.rgb + delta, c.a);
}
"#;

/// p0..p2: reciprocal gamma per channel.
pub const GAMMA: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    let g = vec3<f32>(u_param(0u), u_param(1u), u_param(2u));
    return vec4<f32>(pow(c.rgb, g), c.a);
}
"#;

/// p0: amplitude in unit range, p1/p2: low and high seed halves.
pub const NOISE: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    let p = vec2<u32>(floor(frag.position.xy));
    let seed = u32(u_param(1u)) | (u32(u_param(2u)) << 16u);
    let r = f32(pcg(p.x ^ pcg(p.y ^ pcg(seed)))) / 4294967296.0;
    return vec4<f32>(c.rgb + vec3<f32>((0.5 - r) * u_param(0u)), c.a);
}
"#;

/// p0: invert flag, p1: include alpha.
pub const INVERT: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    if (u_param(0u) < 0.5) {
        return c;
    }
    let a = select(c.a, 1.0 - c.a, u_param(1u) > 0.5);
    return vec4<f32>(vec3<f32>(1.0) - c.rgb, a);
}
"#;

/// p0: block size in pixels.
pub const PIXELATE: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let bs = max(u_param(0u), 1.0);
    let p = floor(floor(frag.position.xy) / bs) * bs;
    return load_source(vec2<i32>(p));
}
"#;

/// p0..p2: lower bound, p4..p6: upper bound.
pub const REMOVE_COLOR: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    let low = vec3<f32>(u_param(0u), u_param(1u), u_param(2u));
    let high = vec3<f32>(u_param(4u), u_param(5u), u_param(6u));
    if (all(c.rgb > low) && all(c.rgb < high)) {
        return vec4<f32>(c.rgb, 0.0);
    }
    return c;
}
"#;

/// Grayscale with the given luminance expression over `c`.
pub fn grayscale(expr: &str) -> String {
    format!(
        r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {{
    let c = sample_source(frag.uv);
    let v = {expr};
    return vec4<f32>(vec3<f32>(v), c.a);
}}
"#
    )
}

/// p0..p19: row-major 4x5 matrix, p20: colors-only flag.
pub const COLOR_MATRIX: &str = r#"
fn matrix_row(i: u32, c: vec4<f32>, alpha_weight: f32) -> f32 {
    return u_param(i) * c.r + u_param(i + 1u) * c.g + u_param(i + 2u) * c.b
        + alpha_weight * u_param(i + 3u) * c.a + u_param(i + 4u);
}

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let c = sample_source(frag.uv);
    let colors_only = u_param(20u) > 0.5;
    let aw = select(1.0, 0.0, colors_only);
    let a = select(matrix_row(15u, c, 1.0), c.a, colors_only);
    return vec4<f32>(matrix_row(0u, c, aw), matrix_row(5u, c, aw), matrix_row(10u, c, aw), a);
}
"#;

// =============================================================================
// Neighbourhood filters
// =============================================================================

/// Square convolution of odd `side`; taps outside the image are skipped.
/// Opaque kernels keep the centre pixel's alpha.
///
/// p0..: kernel weights, row-major.
pub fn convolute(side: u32, opaque: bool) -> String {
    let half = side / 2;
    let result = if opaque {
        "vec4<f32>(acc.rgb, load_source(p).a)"
    } else {
        "acc"
    };
    format!(
        r#"
const SIDE: i32 = {side};
const HALF: i32 = {half};

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {{
    let size = vec2<i32>(textureDimensions(u_texture));
    let p = vec2<i32>(floor(frag.position.xy));
    var acc = vec4<f32>(0.0);
    for (var cy: i32 = 0; cy < SIDE; cy = cy + 1) {{
        for (var cx: i32 = 0; cx < SIDE; cx = cx + 1) {{
            let s = p + vec2<i32>(cx - HALF, cy - HALF);
            if (s.x < 0 || s.y < 0 || s.x >= size.x || s.y >= size.y) {{
                continue;
            }}
            acc = acc + load_source(s) * u_param(u32(cy * SIDE + cx));
        }}
    }}
    return {result};
}}
"#
    )
}

/// Triangle-weighted 31-tap blur along `(p0, p1)` in uv units.
pub const BLUR: &str = r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let delta = vec2<f32>(u_param(0u), u_param(1u));
    var color = vec4<f32>(0.0);
    var total = 0.0;
    for (var t: i32 = -15; t <= 15; t = t + 1) {
        let percent = f32(t) / 15.0;
        let weight = 1.0 - abs(percent);
        color = color + sample_source(frag.uv + delta * percent) * weight;
        total = total + weight;
    }
    return color / total;
}
"#;

/// Symmetric tap filter of half-width `window`.
///
/// p0, p1: texel step along the pass direction; p2..: taps for offsets 1..=window.
pub fn resize(window: u32) -> String {
    format!(
        r#"
const WINDOW: i32 = {window};

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {{
    let delta = vec2<f32>(u_param(0u), u_param(1u));
    var color = sample_source(frag.uv);
    var sum = 1.0;
    for (var i: i32 = 1; i <= WINDOW; i = i + 1) {{
        let tap = u_param(u32(i + 1));
        let offset = f32(i) * delta;
        color = color + (sample_source(frag.uv + offset) + sample_source(frag.uv - offset)) * tap;
        sum = sum + 2.0 * tap;
    }}
    return color / sum;
}}
"#
    )
}

// =============================================================================
// Compositing
// =============================================================================

/// Blend against a constant color; `expr` combines `c` (pixel rgb), `t`
/// (premultiplied-by-alpha color) and `alpha`.
///
/// p0..p2: color in unit range times alpha, p3: alpha.
pub fn blend_color(expr: &str) -> String {
    format!(
        r#"
fn blend(c: vec3<f32>, t: vec3<f32>, alpha: f32) -> vec3<f32> {{
    return {expr};
}}

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {{
    let c = sample_source(frag.uv);
    let t = vec3<f32>(u_param(0u), u_param(1u), u_param(2u));
    return vec4<f32>(blend(c.rgb, t, u_param(3u)), c.a);
}}
"#
    )
}

/// Blend against the secondary texture placed through an affine transform;
/// `expr` combines `c` and `t`.
///
/// p0..p5: inverse placement matrix (target pixels to image pixels),
/// p6, p7: image size in pixels.
pub fn blend_image(expr: &str) -> String {
    format!(
        r#"
@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {{
    let c = sample_source(frag.uv);
    let px = frag.uv * u_step.zw;
    let local = vec2<f32>(
        u_param(0u) * px.x + u_param(2u) * px.y + u_param(4u),
        u_param(1u) * px.x + u_param(3u) * px.y + u_param(5u),
    );
    let size = vec2<f32>(u_param(6u), u_param(7u));
    var t = vec4<f32>(0.0);
    if (all(local >= vec2<f32>(0.0)) && all(local < size)) {{
        t = textureSampleLevel(u_secondary, u_sampler, local / size, 0.0);
    }}
    return {expr};
}}
"#
    )
}
