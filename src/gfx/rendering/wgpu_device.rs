// src/gfx/rendering/wgpu_device.rs
//! The wgpu backend
//!
//! Owns the surface, every GPU resource behind a handle, and the pipeline
//! cache. Frames arrive as [`FrameCommands`], are planned into passes by
//! [`plan_frame`] and encoded into a single command buffer.

use std::collections::HashMap;
use std::iter;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::device::{
    check_texture_size, AddressMode, BufferHandle, DepthStencilDesc, DepthStencilHandle,
    DepthTarget, DepthViewHandle, FilterMode, RasterizerDesc, RasterizerHandle, RenderDevice,
    RenderTarget, RenderTargetHandle, SamplerDesc, SamplerHandle, ShaderHandle, TextureHandle,
};
use super::frame::{ColorTarget, FrameCommands};
use super::pipeline_cache::{compare_function, CompiledShader, PipelineCache, PipelineKey};
use super::replay::{plan_frame, DrawPlan, Geometry, PassPlan, StageBindings, Step};
use crate::error::RenderError;
use crate::gfx::resources::shader::{SamplerKind, ShaderDesc, TextureKind};
use crate::gfx::resources::texture_data::{CubemapData, TextureData};
use crate::gfx::resources::texture_resource::TextureResource;
use crate::gfx::scene::vertex::Vertex;
use crate::wgpu_utils::UniformArena;

/// Zero-filled block bound to uniform slots nothing has written this frame
const ZERO_BLOCK_SIZE: u64 = 4096;

struct GpuSampler {
    sampler: wgpu::Sampler,
    comparison: bool,
}

/// Bound wherever a slot has nothing (or the wrong kind of thing) assigned
struct Fallbacks {
    color: TextureResource,
    depth: TextureResource,
    cube: TextureResource,
    filtering: wgpu::Sampler,
    comparison: wgpu::Sampler,
    zero_block: wgpu::Buffer,
}

impl Fallbacks {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            color: TextureResource::create_fallback(device, queue, TextureKind::Color2d),
            depth: TextureResource::create_fallback(device, queue, TextureKind::Depth2d),
            cube: TextureResource::create_fallback(device, queue, TextureKind::Cube),
            filtering: device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("fallback_sampler"),
                ..Default::default()
            }),
            comparison: device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("fallback_comparison_sampler"),
                compare: Some(wgpu::CompareFunction::LessEqual),
                ..Default::default()
            }),
            zero_block: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("zero_uniforms"),
                size: ZERO_BLOCK_SIZE,
                usage: wgpu::BufferUsages::UNIFORM,
                mapped_at_creation: false,
            }),
        }
    }

    fn texture(&self, kind: TextureKind) -> &wgpu::TextureView {
        match kind {
            TextureKind::Color2d => &self.color.view,
            TextureKind::Depth2d => &self.depth.view,
            TextureKind::Cube => &self.cube.view,
        }
    }
}

/// A draw with everything wgpu needs resolved
struct PreparedDraw {
    key: PipelineKey,
    bind_groups: Vec<wgpu::BindGroup>,
}

pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,

    next_id: u32,
    buffers: HashMap<u32, wgpu::Buffer>,
    textures: HashMap<u32, TextureResource>,
    samplers: HashMap<u32, GpuSampler>,
    rasterizers: HashMap<u32, RasterizerDesc>,
    depth_states: HashMap<u32, DepthStencilDesc>,

    pipelines: PipelineCache,
    uniforms: UniformArena,
    fallbacks: Fallbacks,
    main_depth: DepthTarget,
}

impl WgpuDevice {
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::AdapterUnavailable(e.to_string()))?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::DeviceRequest(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("surface reports no formats".to_string()))?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniforms = UniformArena::new(&device);
        let fallbacks = Fallbacks::new(&device, &queue);

        let mut this = Self {
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            rasterizers: HashMap::new(),
            depth_states: HashMap::new(),
            pipelines: PipelineCache::new(),
            uniforms,
            fallbacks,
            main_depth: DepthTarget {
                depth_view: DepthViewHandle(0),
                shader_view: TextureHandle(0),
                width: 0,
                height: 0,
            },
        };
        this.main_depth = this.allocate_depth("main_depth", this.config.width, this.config.height);
        Ok(this)
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Reconfigures the swap chain and replaces the main depth buffer.
    /// A zero-sized window (minimized) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        let old = self.main_depth.shader_view;
        self.release_texture(old);
        self.main_depth = self.allocate_depth("main_depth", width, height);
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn allocate_depth(&mut self, label: &str, width: u32, height: u32) -> DepthTarget {
        let id = self.next();
        self.textures.insert(
            id,
            TextureResource::create_depth_texture(&self.device, width, height, label),
        );
        DepthTarget {
            depth_view: DepthViewHandle(id),
            shader_view: TextureHandle(id),
            width,
            height,
        }
    }

    fn insert_texture(&mut self, texture: TextureResource) -> u32 {
        let id = self.next();
        self.textures.insert(id, texture);
        id
    }

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn create_buffer(
        &mut self,
        label: &str,
        kind: &'static str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<BufferHandle, RenderError> {
        if contents.is_empty() {
            return Err(RenderError::EmptyBuffer {
                kind,
                label: label.to_string(),
            });
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            });
        let id = self.next();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn texture(&self, id: u32) -> Result<&TextureResource, RenderError> {
        self.textures
            .get(&id)
            .ok_or(RenderError::UnknownHandle { kind: "texture", id })
    }

    fn attachment_size(&self, pass: &PassPlan) -> (u32, u32) {
        let texture = match (pass.color, pass.depth) {
            (Some(ColorTarget::Texture(handle)), _) => self.textures.get(&handle.0),
            (Some(ColorTarget::BackBuffer), _) => None,
            (None, Some(depth)) => self.textures.get(&depth.0),
            (None, None) => None,
        };
        match texture {
            Some(texture) => (texture.texture.width(), texture.texture.height()),
            None => (self.config.width, self.config.height),
        }
    }

    fn pipeline_key(&self, pass: &PassPlan, draw: &DrawPlan) -> Result<PipelineKey, RenderError> {
        let color_format = match pass.color {
            Some(ColorTarget::BackBuffer) => Some(self.config.format),
            Some(ColorTarget::Texture(handle)) => Some(self.texture(handle.0)?.format()),
            None => None,
        };
        let depth_format = match pass.depth {
            Some(handle) => Some(self.texture(handle.0)?.format()),
            None => None,
        };
        Ok(PipelineKey {
            vertex_shader: draw.vertex_shader.handle(),
            pixel_shader: draw.pixel_shader.as_ref().map(|ps| ps.handle()),
            color_format,
            depth_format,
            rasterizer: draw.rasterizer,
            depth_stencil: draw.depth_stencil,
        })
    }

    fn create_bind_group(&self, shader: &CompiledShader, bindings: &StageBindings) -> wgpu::BindGroup {
        let desc = &shader.desc;
        let mut entries = Vec::new();

        for block in &desc.uniform_blocks {
            let size = block.layout.size() as u64;
            let resource = match bindings.uniforms.get(&block.binding) {
                Some(range) if range.size >= size => self.uniforms.binding_resource(range.offset, size),
                _ => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.fallbacks.zero_block,
                    offset: 0,
                    size: wgpu::BufferSize::new(size.min(ZERO_BLOCK_SIZE)),
                }),
            };
            entries.push(wgpu::BindGroupEntry {
                binding: block.binding,
                resource,
            });
        }

        for slot in &desc.textures {
            let view = bindings
                .textures
                .get(&slot.binding)
                .and_then(|handle| self.textures.get(&handle.0))
                .filter(|texture| texture.kind == slot.kind)
                .map(|texture| &texture.view)
                .unwrap_or_else(|| self.fallbacks.texture(slot.kind));
            entries.push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        for slot in &desc.samplers {
            let wants_comparison = slot.kind == SamplerKind::Comparison;
            let sampler = bindings
                .samplers
                .get(&slot.binding)
                .and_then(|handle| self.samplers.get(&handle.0))
                .filter(|s| s.comparison == wants_comparison)
                .map(|s| &s.sampler)
                .unwrap_or(if wants_comparison {
                    &self.fallbacks.comparison
                } else {
                    &self.fallbacks.filtering
                });
            entries.push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &shader.layout,
            entries: &entries,
        })
    }

    /// Builds missing pipelines and every bind group the frame uses
    fn prepare_pass(&mut self, pass: &PassPlan) -> Result<Vec<PreparedDraw>, RenderError> {
        let mut prepared = Vec::with_capacity(pass.draws.len());
        for draw in &pass.draws {
            let key = self.pipeline_key(pass, draw)?;
            let rasterizer = draw
                .rasterizer
                .and_then(|h| self.rasterizers.get(&h.0).copied())
                .unwrap_or_default();
            let depth_stencil = draw
                .depth_stencil
                .and_then(|h| self.depth_states.get(&h.0).copied())
                .unwrap_or_default();
            self.pipelines
                .prepare(&self.device, key, &rasterizer, &depth_stencil)?;

            let mut bind_groups = Vec::with_capacity(2);
            let vertex = self.pipelines.shader(key.vertex_shader).ok_or(RenderError::UnknownHandle {
                kind: "shader",
                id: key.vertex_shader.0,
            })?;
            bind_groups.push(self.create_bind_group(vertex, &draw.vertex_bindings));
            if let Some(handle) = key.pixel_shader {
                let pixel = self.pipelines.shader(handle).ok_or(RenderError::UnknownHandle {
                    kind: "shader",
                    id: handle.0,
                })?;
                bind_groups.push(self.create_bind_group(pixel, &draw.pixel_bindings));
            }
            prepared.push(PreparedDraw { key, bind_groups });
        }
        Ok(prepared)
    }

    /// Replays a recorded frame and presents it
    ///
    /// `overlay` runs at the frame's [`DrawOverlay`](super::frame::RenderCommand::DrawOverlay)
    /// with the back buffer view. A lost or outdated surface is reconfigured
    /// and the frame skipped.
    pub fn submit<F>(&mut self, frame: &FrameCommands, overlay: F) -> Result<(), RenderError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let plan = plan_frame(frame);

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, frame skipped");
                return Ok(());
            }
            Err(e) => return Err(RenderError::SurfaceAcquire(e.to_string())),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.config.format),
                ..Default::default()
            });

        self.uniforms.upload(&self.device, &self.queue, &plan.uniforms);

        let mut prepared = Vec::new();
        for step in &plan.steps {
            if let Step::Pass(pass) = step {
                prepared.push(self.prepare_pass(pass)?);
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let mut overlay = Some(overlay);
        let mut prepared = prepared.into_iter();
        for step in &plan.steps {
            match step {
                Step::Pass(pass) => {
                    let draws = prepared.next().unwrap_or_default();
                    self.encode_pass(&mut encoder, &surface_view, pass, &draws)?;
                }
                Step::Overlay => match overlay.take() {
                    Some(render_ui) => render_ui(&self.device, &self.queue, &mut encoder, &surface_view),
                    None => log::warn!("overlay requested twice in one frame"),
                },
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        if plan.presents {
            surface_texture.present();
        }
        Ok(())
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        pass: &PassPlan,
        draws: &[PreparedDraw],
    ) -> Result<(), RenderError> {
        let color_view = match pass.color {
            Some(ColorTarget::BackBuffer) => Some(surface_view),
            Some(ColorTarget::Texture(handle)) => Some(self.attachment(handle.0)?),
            None => None,
        };
        let depth_view = match pass.depth {
            Some(handle) => Some(self.attachment(handle.0)?),
            None => None,
        };

        let color_load = match pass.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };
        // Depth-only passes carry no color slot at all, matching their pipelines
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_view
            .into_iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: match pass.clear_depth {
                        Some(depth) => wgpu::LoadOp::Clear(depth),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let (max_width, max_height) = self.attachment_size(pass);
        for (draw, prepared) in pass.draws.iter().zip(draws) {
            let Some(pipeline) = self.pipelines.pipeline(&prepared.key) else {
                continue;
            };
            render_pass.set_pipeline(pipeline);
            for (index, bind_group) in prepared.bind_groups.iter().enumerate() {
                render_pass.set_bind_group(index as u32, bind_group, &[]);
            }
            if let Some((width, height)) = draw.viewport {
                render_pass.set_viewport(
                    0.0,
                    0.0,
                    width.min(max_width) as f32,
                    height.min(max_height) as f32,
                    0.0,
                    1.0,
                );
            }

            match draw.geometry {
                Geometry::Indexed {
                    vertex_buffer,
                    index_buffer,
                    index_count,
                } => {
                    let (Some(vertices), Some(indices)) = (
                        self.buffers.get(&vertex_buffer.0),
                        self.buffers.get(&index_buffer.0),
                    ) else {
                        log::warn!("draw references a released buffer, skipped");
                        continue;
                    };
                    render_pass.set_vertex_buffer(0, vertices.slice(..));
                    render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..index_count, 0, 0..1);
                }
                Geometry::Generated { vertex_count } => render_pass.draw(0..vertex_count, 0..1),
            }
        }
        Ok(())
    }

    fn attachment(&self, id: u32) -> Result<&wgpu::TextureView, RenderError> {
        self.texture(id)?
            .attachment
            .as_ref()
            .ok_or(RenderError::UnknownHandle {
                kind: "render target",
                id,
            })
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn sampler_descriptor(desc: &SamplerDesc) -> wgpu::SamplerDescriptor<'_> {
    let address_mode = match desc.address_mode {
        AddressMode::Wrap => wgpu::AddressMode::Repeat,
        AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
    };
    let (filter, anisotropy_clamp) = match desc.filter {
        FilterMode::Point => (wgpu::FilterMode::Nearest, 1),
        FilterMode::Linear => (wgpu::FilterMode::Linear, 1),
        FilterMode::Anisotropic(level) => (wgpu::FilterMode::Linear, level.clamp(1, 16)),
    };
    wgpu::SamplerDescriptor {
        label: Some(&desc.label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: filter,
        lod_min_clamp: 0.0,
        lod_max_clamp: 32.0,
        compare: desc.compare.map(compare_function),
        anisotropy_clamp,
        border_color: None,
    }
}

impl RenderDevice for WgpuDevice {
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        vertices: &[Vertex],
    ) -> Result<BufferHandle, RenderError> {
        self.create_buffer(
            label,
            "vertex",
            bytemuck::cast_slice(vertices),
            wgpu::BufferUsages::VERTEX,
        )
    }

    fn create_index_buffer(
        &mut self,
        label: &str,
        indices: &[u32],
    ) -> Result<BufferHandle, RenderError> {
        self.create_buffer(
            label,
            "index",
            bytemuck::cast_slice(indices),
            wgpu::BufferUsages::INDEX,
        )
    }

    fn create_texture_2d(
        &mut self,
        label: &str,
        data: &TextureData,
    ) -> Result<TextureHandle, RenderError> {
        check_texture_size(label, data.width, data.height, self.max_texture_dimension())?;
        let texture = TextureResource::create_from_data(&self.device, &self.queue, data, label);
        Ok(TextureHandle(self.insert_texture(texture)))
    }

    fn create_cubemap(
        &mut self,
        label: &str,
        data: &CubemapData,
    ) -> Result<TextureHandle, RenderError> {
        check_texture_size(label, data.size, data.size, self.max_texture_dimension())?;
        let texture = TextureResource::create_cubemap(&self.device, &self.queue, data, label);
        Ok(TextureHandle(self.insert_texture(texture)))
    }

    fn create_depth_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<DepthTarget, RenderError> {
        check_texture_size(label, width, height, self.max_texture_dimension())?;
        Ok(self.allocate_depth(label, width, height))
    }

    fn create_render_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, RenderError> {
        check_texture_size(label, width, height, self.max_texture_dimension())?;
        let texture = TextureResource::create_render_target(&self.device, width, height, label);
        let id = self.insert_texture(texture);
        Ok(RenderTarget {
            target: RenderTargetHandle(id),
            shader_view: TextureHandle(id),
            width,
            height,
        })
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(resource) = self.textures.remove(&texture.0) {
            resource.texture.destroy();
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, RenderError> {
        let sampler = self.device.create_sampler(&sampler_descriptor(desc));
        let id = self.next();
        self.samplers.insert(
            id,
            GpuSampler {
                sampler,
                comparison: desc.compare.is_some(),
            },
        );
        Ok(SamplerHandle(id))
    }

    fn create_rasterizer_state(
        &mut self,
        desc: &RasterizerDesc,
    ) -> Result<RasterizerHandle, RenderError> {
        let id = self.next();
        self.rasterizers.insert(id, *desc);
        Ok(RasterizerHandle(id))
    }

    fn create_depth_stencil_state(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<DepthStencilHandle, RenderError> {
        let id = self.next();
        self.depth_states.insert(id, *desc);
        Ok(DepthStencilHandle(id))
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<ShaderHandle, RenderError> {
        let handle = ShaderHandle(self.next());
        self.pipelines.load_shader(&self.device, handle, desc)?;
        Ok(handle)
    }

    fn back_buffer_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn main_depth(&self) -> DepthViewHandle {
        self.main_depth.depth_view
    }
}
