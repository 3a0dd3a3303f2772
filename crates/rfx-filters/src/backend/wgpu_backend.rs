//! wgpu filter backend.
//!
//! Each filter pass is a fullscreen draw into a render target texture. Two
//! targets ping-pong: after every pass the target becomes the next pass's
//! source. Passes are recorded into one command encoder that is submitted
//! when the chain's pass counter reaches zero; the result is then copied to
//! the destination canvas with the [`CopyStrategy`] picked at construction.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rfx_core::{Canvas, FilterConfig, Surface};
use tracing::{debug, info, trace, warn};
use wgpu::util::DeviceExt;

use super::cache::ResourceCache;
use super::{BackendKind, FilterOutput};
use crate::filter::{PassInfo, UniformBlock};
use crate::shaders;
use crate::state::PipelineState;
use crate::{Filter, FilterError, FilterResult};

/// Texture format of every filter target.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Program cache key of the draw-based copy.
pub const COPY_PROGRAM_KEY: &str = "__copy";

// =============================================================================
// Binding table
// =============================================================================

/// Binding slots shared by every program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingTable {
    pub source: u32,
    pub sampler: u32,
    pub params: u32,
    pub step: u32,
    pub secondary: u32,
    pub original: u32,
}

pub const BINDINGS: BindingTable = BindingTable {
    source: 0,
    sampler: 1,
    params: 2,
    step: 3,
    secondary: 4,
    original: 5,
};

// =============================================================================
// Textures and programs
// =============================================================================

/// A render-target texture and its view.
pub struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GpuTexture {
    fn new(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, width, height }
    }

    fn upload(device: &wgpu::Device, queue: &wgpu::Queue, surface: &Surface, label: &str) -> Self {
        let (width, height) = surface.dimensions();
        let tex = Self::new(device, width, height, label);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            surface.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
        tex
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuTexture").field("width", &self.width).field("height", &self.height).finish()
    }
}

/// A linked render pipeline and its binding table.
pub struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    locations: BindingTable,
}

impl fmt::Debug for GpuProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuProgram").field("locations", &self.locations).finish()
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d { width, height, depth_or_array_layers: 1 }
}

// =============================================================================
// GpuContext
// =============================================================================

/// Device, queue and the objects every program shares.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    max_texture_size: u32,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    empty: Arc<GpuTexture>,
}

impl GpuContext {
    /// Create a context on the preferred adapter.
    pub fn new() -> FilterResult<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> FilterResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FilterError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("rfx-filters"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| FilterError::DeviceCreation(e.to_string()))?;

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("filter_bind_group_layout"),
            entries: &[
                texture_entry(BINDINGS.source),
                wgpu::BindGroupLayoutEntry {
                    binding: BINDINGS.sampler,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry(BINDINGS.params),
                uniform_entry(BINDINGS.step),
                texture_entry(BINDINGS.secondary),
                texture_entry(BINDINGS.original),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("filter_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("filter_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let empty = Arc::new(GpuTexture::upload(&device, &queue, &Surface::new(1, 1), "empty_secondary"));

        Ok(Self {
            device,
            queue,
            max_texture_size: adapter_limits.max_texture_dimension_2d,
            adapter_info,
            bind_group_layout,
            pipeline_layout,
            sampler,
            empty,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    /// Compile `fragment` with the shared prelude and link a render pipeline.
    ///
    /// Validation errors are captured and returned as
    /// [`FilterError::ShaderCompilation`].
    fn compile(&self, key: &str, fragment: &str) -> FilterResult<GpuProgram> {
        let source = shaders::program_source(fragment);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(key),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TEXTURE_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(FilterError::ShaderCompilation { key: key.to_string(), message: err.to_string() });
        }
        debug!(key, "compiled filter program");
        Ok(GpuProgram { pipeline, locations: BINDINGS })
    }

    fn uniform_buffer(&self, label: &str, bytes: &[u8]) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::UNIFORM,
        })
    }

    /// Record one fullscreen draw of `program` into `target`.
    #[allow(clippy::too_many_arguments)]
    fn record_draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        program: &GpuProgram,
        source: &GpuTexture,
        secondary: &GpuTexture,
        original: &GpuTexture,
        target: &GpuTexture,
        uniforms: &UniformBlock,
    ) {
        let step = [
            1.0 / source.width as f32,
            1.0 / source.height as f32,
            source.width as f32,
            source.height as f32,
        ];
        let params = self.uniform_buffer("filter_params", uniforms.as_bytes());
        let step = self.uniform_buffer("filter_step", bytemuck::cast_slice(&step));
        let loc = program.locations;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("filter_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: loc.source, resource: wgpu::BindingResource::TextureView(&source.view) },
                wgpu::BindGroupEntry { binding: loc.sampler, resource: wgpu::BindingResource::Sampler(&self.sampler) },
                wgpu::BindGroupEntry { binding: loc.params, resource: params.as_entire_binding() },
                wgpu::BindGroupEntry { binding: loc.step, resource: step.as_entire_binding() },
                wgpu::BindGroupEntry { binding: loc.secondary, resource: wgpu::BindingResource::TextureView(&secondary.view) },
                wgpu::BindGroupEntry { binding: loc.original, resource: wgpu::BindingResource::TextureView(&original.view) },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("filter_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encoder(&self) -> wgpu::CommandEncoder {
        self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("filter_encoder") })
    }

    /// Read a texture back as tightly packed RGBA bytes.
    fn read_texture(&self, texture: &GpuTexture) -> FilterResult<Vec<u8>> {
        let (width, height) = texture.dimensions();
        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.encoder();
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );
        self.submit(encoder);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| FilterError::OperationFailed("Map channel closed".into()))?
            .map_err(|e| FilterError::OperationFailed(format!("Map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let mut out = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize) {
            out.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        staging.unmap();
        Ok(out)
    }
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("device", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .field("max_texture_size", &self.max_texture_size)
            .finish()
    }
}

// =============================================================================
// Copy strategy
// =============================================================================

/// How the final texture reaches the destination canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// Blit through a draw, then draw the pixels into the canvas.
    DrawImage,
    /// Read the pixels back and write them into the canvas verbatim.
    PutImageData,
}

impl CopyStrategy {
    /// Copy `texture` into `destination`, resizing it to the texture size.
    fn copy(
        self,
        context: &GpuContext,
        programs: &mut ResourceCache<Arc<GpuProgram>>,
        texture: &GpuTexture,
        destination: &mut Canvas,
    ) -> FilterResult<()> {
        let (width, height) = texture.dimensions();
        match self {
            CopyStrategy::DrawImage => {
                let program = Self::copy_program(context, programs)?;
                let blit = GpuTexture::new(&context.device, width, height, "copy_target");
                let mut encoder = context.encoder();
                context.record_draw(
                    &mut encoder,
                    &program,
                    texture,
                    &context.empty,
                    texture,
                    &blit,
                    &UniformBlock::new(),
                );
                context.submit(encoder);
                let pixels = Surface::from_rgba(width, height, context.read_texture(&blit)?)?;
                destination.set_size(width, height);
                if let Some(ctx) = destination.context_2d() {
                    ctx.draw_image(&pixels, width, height);
                }
            }
            CopyStrategy::PutImageData => {
                let pixels = context.read_texture(texture)?;
                destination.set_size(width, height);
                if let Some(ctx) = destination.context_2d() {
                    ctx.put_image_data(&pixels, width, height)?;
                }
            }
        }
        Ok(())
    }

    fn copy_program(
        context: &GpuContext,
        programs: &mut ResourceCache<Arc<GpuProgram>>,
    ) -> FilterResult<Arc<GpuProgram>> {
        programs
            .get_or_try_insert_with(COPY_PROGRAM_KEY, || {
                context.compile(COPY_PROGRAM_KEY, shaders::PASSTHROUGH).map(Arc::new)
            })
            .cloned()
    }

    /// Time both strategies once on a `size x size` throwaway texture and
    /// return the faster.
    fn benchmark(
        context: &GpuContext,
        programs: &mut ResourceCache<Arc<GpuProgram>>,
        size: u32,
    ) -> FilterResult<Self> {
        let size = size.clamp(1, context.max_texture_size);
        let texture = GpuTexture::new(&context.device, size, size, "copy_benchmark");
        let mut canvas = Canvas::new(size, size);
        // Compile outside the timed region.
        Self::copy_program(context, programs)?;

        let mut time = |strategy: CopyStrategy| -> FilterResult<Duration> {
            let start = Instant::now();
            strategy.copy(context, programs, &texture, &mut canvas)?;
            Ok(start.elapsed())
        };
        let draw = time(CopyStrategy::DrawImage)?;
        let put = time(CopyStrategy::PutImageData)?;

        let chosen = if draw < put { CopyStrategy::DrawImage } else { CopyStrategy::PutImageData };
        debug!(size, ?draw, ?put, ?chosen, "copy strategy benchmark");
        Ok(chosen)
    }
}

// =============================================================================
// GpuPipelineState
// =============================================================================

/// GPU chain state: ping-pong targets, the original upload and the caches.
pub struct GpuPipelineState<'a> {
    pub source_width: u32,
    pub source_height: u32,
    pub destination_width: u32,
    pub destination_height: u32,
    context: &'a GpuContext,
    programs: &'a mut ResourceCache<Arc<GpuProgram>>,
    textures: &'a mut ResourceCache<Arc<GpuTexture>>,
    source: GpuTexture,
    target: GpuTexture,
    original: Arc<GpuTexture>,
    secondary: Arc<GpuTexture>,
    passes_remaining: u32,
    encoder: Option<wgpu::CommandEncoder>,
}

impl<'a> GpuPipelineState<'a> {
    fn new(
        context: &'a GpuContext,
        programs: &'a mut ResourceCache<Arc<GpuProgram>>,
        textures: &'a mut ResourceCache<Arc<GpuTexture>>,
        original: Arc<GpuTexture>,
        passes: u32,
    ) -> Self {
        let (width, height) = original.dimensions();
        let source = GpuTexture::new(&context.device, width, height, "source_texture");
        let target = GpuTexture::new(&context.device, width, height, "target_texture");

        let mut encoder = context.encoder();
        encoder.copy_texture_to_texture(
            original.texture.as_image_copy(),
            source.texture.as_image_copy(),
            extent(width, height),
        );

        Self {
            source_width: width,
            source_height: height,
            destination_width: width,
            destination_height: height,
            context,
            programs,
            textures,
            source,
            target,
            original,
            secondary: context.empty.clone(),
            passes_remaining: passes,
            encoder: Some(encoder),
        }
    }

    /// Passes still expected before the chain submits.
    pub fn passes_remaining(&self) -> u32 {
        self.passes_remaining
    }

    /// Account for passes beyond the one slot each listed filter occupies.
    pub fn reserve_passes(&mut self, extra: u32) {
        self.passes_remaining += extra;
    }

    /// Run every planned pass of `filter`.
    pub fn run_filter<F: Filter + ?Sized>(&mut self, filter: &F) -> FilterResult<()> {
        let plan = filter.plan_passes(self.source_width, self.source_height);
        self.reserve_passes((plan.len() as u32).saturating_sub(1));
        for pass in &plan {
            self.run_pass(filter, pass)?;
        }
        Ok(())
    }

    fn run_pass<F: Filter + ?Sized>(&mut self, filter: &F, pass: &PassInfo) -> FilterResult<()> {
        let context = self.context;
        let key = filter.shader_key(pass);
        let program = self
            .programs
            .get_or_try_insert_with(&key, || context.compile(&key, &filter.fragment_shader(pass)).map(Arc::new))?
            .clone();

        self.setup_framebuffer(pass.dest_width, pass.dest_height)?;

        let mut uniforms = UniformBlock::new();
        filter.send_uniform_data(pass, &mut uniforms);

        let restore = match filter.secondary_source() {
            Some(src) => {
                let texture = self
                    .textures
                    .get_or_try_insert_with(src.key, || {
                        Ok::<_, FilterError>(Arc::new(GpuTexture::upload(
                            &context.device,
                            &context.queue,
                            src.surface,
                            src.key,
                        )))
                    })?
                    .clone();
                Some(std::mem::replace(&mut self.secondary, texture))
            }
            None => None,
        };

        trace!(key = %key, pass = pass.index, w = pass.dest_width, h = pass.dest_height, "gpu pass");
        let encoder = self.encoder.get_or_insert_with(|| context.encoder());
        context.record_draw(
            encoder,
            &program,
            &self.source,
            &self.secondary,
            &self.original,
            &self.target,
            &uniforms,
        );

        if let Some(previous) = restore {
            self.secondary = previous;
        }

        self.swap_textures();
        self.source_width = pass.dest_width;
        self.source_height = pass.dest_height;
        self.destination_width = pass.dest_width;
        self.destination_height = pass.dest_height;

        self.passes_remaining = self.passes_remaining.saturating_sub(1);
        if self.passes_remaining == 0 {
            self.flush();
        }
        Ok(())
    }

    /// Make the target match the pass output size.
    fn setup_framebuffer(&mut self, width: u32, height: u32) -> FilterResult<()> {
        let limit = self.context.max_texture_size;
        if width > limit || height > limit {
            return Err(FilterError::ImageTooLarge { width, height, limit });
        }
        if self.target.dimensions() != (width, height) {
            self.target = GpuTexture::new(&self.context.device, width, height, "target_texture");
        }
        Ok(())
    }

    fn swap_textures(&mut self) {
        std::mem::swap(&mut self.source, &mut self.target);
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.context.submit(encoder);
        }
    }

    /// Submit outstanding work and hand back the result texture.
    fn finish(mut self) -> GpuTexture {
        self.flush();
        self.source
    }
}

impl fmt::Debug for GpuPipelineState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuPipelineState")
            .field("source", &(self.source_width, self.source_height))
            .field("destination", &(self.destination_width, self.destination_height))
            .field("passes_remaining", &self.passes_remaining)
            .finish()
    }
}

// =============================================================================
// WgpuBackend
// =============================================================================

/// Fragment-shader backend.
pub struct WgpuBackend {
    context: Option<GpuContext>,
    programs: ResourceCache<Arc<GpuProgram>>,
    textures: ResourceCache<Arc<GpuTexture>>,
    copy_strategy: CopyStrategy,
}

impl WgpuBackend {
    /// Check if a wgpu adapter can be obtained.
    pub fn is_available() -> bool {
        super::capabilities().gpu_available
    }

    /// Create the device and pick the copy strategy.
    pub fn new(config: &FilterConfig) -> FilterResult<Self> {
        let context = GpuContext::new()?;
        let mut programs = ResourceCache::new();
        let copy_strategy = if config.force_put_image_data {
            CopyStrategy::PutImageData
        } else {
            CopyStrategy::benchmark(&context, &mut programs, config.texture_size)?
        };
        info!(
            adapter = context.adapter_name(),
            max_texture_size = context.max_texture_size(),
            ?copy_strategy,
            "wgpu backend initialized"
        );
        Ok(Self { context: Some(context), programs, textures: ResourceCache::new(), copy_strategy })
    }

    /// Device texture limit, `None` once disposed.
    pub fn max_texture_size(&self) -> Option<u32> {
        self.context.as_ref().map(GpuContext::max_texture_size)
    }

    pub fn copy_strategy(&self) -> CopyStrategy {
        self.copy_strategy
    }

    /// Compiled program cache.
    pub fn programs(&self) -> &ResourceCache<Arc<GpuProgram>> {
        &self.programs
    }

    /// Uploaded texture cache.
    pub fn textures(&self) -> &ResourceCache<Arc<GpuTexture>> {
        &self.textures
    }

    /// See [`super::FilterBackend::apply_filters`].
    pub fn apply_filters(
        &mut self,
        filters: &[&dyn Filter],
        source: &Surface,
        width: u32,
        height: u32,
        destination: &mut Canvas,
        cache_key: Option<&str>,
    ) -> FilterResult<Option<FilterOutput>> {
        if width == 0 || height == 0 {
            return Err(FilterError::Core(rfx_core::Error::InvalidDimensions { width, height }));
        }
        if destination.context_2d().is_none() {
            warn!("destination canvas has no 2D context, skipping filters");
            return Ok(None);
        }
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| FilterError::BackendNotAvailable("wgpu backend disposed".into()))?;
        let limit = context.max_texture_size;
        if width > limit || height > limit {
            return Err(FilterError::ImageTooLarge { width, height, limit });
        }

        let upload = || -> FilterResult<Arc<GpuTexture>> {
            let texture = if source.dimensions() == (width, height) {
                GpuTexture::upload(&context.device, &context.queue, source, "original_texture")
            } else {
                let mut scaled = Surface::new(width, height);
                scaled.draw_image(source, width, height);
                GpuTexture::upload(&context.device, &context.queue, &scaled, "original_texture")
            };
            Ok(Arc::new(texture))
        };
        let original = match cache_key {
            Some(key) => self.textures.get_or_try_insert_with(key, upload)?.clone(),
            None => upload()?,
        };

        debug!(filters = filters.len(), width, height, "gpu chain");
        let state =
            GpuPipelineState::new(context, &mut self.programs, &mut self.textures, original, filters.len() as u32);
        let mut state = PipelineState::Gpu(state);
        for filter in filters {
            trace!(filter = filter.filter_type(), "apply");
            filter.apply_to(&mut state)?;
        }
        let state = state
            .into_gpu()
            .ok_or_else(|| FilterError::BackendNotAvailable("gpu chain produced a cpu state".into()))?;
        let result = state.finish();

        self.copy_strategy.copy(context, &mut self.programs, &result, destination)?;
        let (out_w, out_h) = result.dimensions();
        Ok(Some(FilterOutput { width: out_w, height: out_h, backend: BackendKind::Wgpu }))
    }

    /// Drop the cached texture and program stored under `key`.
    pub fn evict_caches_for_key(&mut self, key: &str) {
        let texture = self.textures.evict(key).is_some();
        let program = self.programs.evict(key).is_some();
        debug!(key, texture, program, "evicted cache entries");
    }

    /// Clear both caches and drop the device.
    pub fn dispose(&mut self) {
        self.programs.clear();
        self.textures.clear();
        if self.context.take().is_some() {
            info!("wgpu backend disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.context.is_none()
    }
}

impl fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("context", &self.context)
            .field("programs", &self.programs.len())
            .field("textures", &self.textures.len())
            .field("copy_strategy", &self.copy_strategy)
            .finish()
    }
}
