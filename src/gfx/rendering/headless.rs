// src/gfx/rendering/headless.rs
//! GPU-less device for tests and tooling
//!
//! Allocates handles and remembers what each one describes, enforces the
//! same size limits as the wgpu backend, and validates submitted frames
//! against the live resource set.

use std::collections::HashMap;

use super::device::{
    check_texture_size, BufferHandle, DepthStencilDesc, DepthStencilHandle, DepthTarget,
    DepthViewHandle, RasterizerDesc, RasterizerHandle, RenderDevice, RenderTarget,
    RenderTargetHandle, SamplerDesc, SamplerHandle, ShaderHandle, TextureHandle,
};
use super::frame::{ColorTarget, FrameCommands, RenderCommand};
use crate::error::RenderError;
use crate::gfx::resources::shader::{ShaderDesc, ShaderStage};
use crate::gfx::resources::texture_data::{CubemapData, TextureData};
use crate::gfx::scene::vertex::Vertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    Sampled,
    Cube,
    Depth,
    RenderTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub usage: TextureUsage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    pub label: String,
    pub size: u64,
}

#[derive(Debug)]
pub struct HeadlessDevice {
    width: u32,
    height: u32,
    max_texture_dimension: u32,
    next_id: u32,
    buffers: HashMap<u32, BufferInfo>,
    textures: HashMap<u32, TextureInfo>,
    released: Vec<TextureHandle>,
    samplers: HashMap<u32, SamplerDesc>,
    rasterizers: HashMap<u32, RasterizerDesc>,
    depth_states: HashMap<u32, DepthStencilDesc>,
    shaders: HashMap<u32, (&'static str, ShaderStage)>,
    main_depth: DepthTarget,
}

impl HeadlessDevice {
    /// wgpu's default `max_texture_dimension_2d`
    pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

    pub fn new(width: u32, height: u32) -> Self {
        let mut device = Self {
            width,
            height,
            max_texture_dimension: Self::MAX_TEXTURE_DIMENSION,
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            released: Vec::new(),
            samplers: HashMap::new(),
            rasterizers: HashMap::new(),
            depth_states: HashMap::new(),
            shaders: HashMap::new(),
            main_depth: DepthTarget {
                depth_view: DepthViewHandle(0),
                shader_view: TextureHandle(0),
                width,
                height,
            },
        };
        device.main_depth = device.allocate_depth("main_depth", width, height);
        device
    }

    /// Mirrors a swap-chain resize: the main depth buffer is replaced
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let old = self.main_depth.shader_view;
        self.release_texture(old);
        self.main_depth = self.allocate_depth("main_depth", width, height);
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureInfo> {
        self.textures.get(&handle.0)
    }

    pub fn is_live(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(&handle.0)
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn released_textures(&self) -> &[TextureHandle] {
        &self.released
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&BufferInfo> {
        self.buffers.get(&handle.0)
    }

    pub fn sampler(&self, handle: SamplerHandle) -> Option<&SamplerDesc> {
        self.samplers.get(&handle.0)
    }

    pub fn rasterizer(&self, handle: RasterizerHandle) -> Option<&RasterizerDesc> {
        self.rasterizers.get(&handle.0)
    }

    pub fn depth_stencil(&self, handle: DepthStencilHandle) -> Option<&DepthStencilDesc> {
        self.depth_states.get(&handle.0)
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Checks every handle a frame references against the live set
    pub fn submit(&self, frame: FrameCommands) -> Result<(), RenderError> {
        for command in frame.commands() {
            self.validate(command)?;
        }
        Ok(())
    }

    fn validate(&self, command: &RenderCommand) -> Result<(), RenderError> {
        let texture = |id: u32| -> Result<(), RenderError> {
            if self.textures.contains_key(&id) {
                Ok(())
            } else {
                Err(RenderError::UnknownHandle {
                    kind: "texture",
                    id,
                })
            }
        };
        let color = |target: &ColorTarget| match target {
            ColorTarget::BackBuffer => Ok(()),
            ColorTarget::Texture(t) => texture(t.0),
        };

        match command {
            RenderCommand::ClearColor { target, .. } => color(target),
            RenderCommand::ClearDepth { target, .. } => texture(target.0),
            RenderCommand::SetRenderTargets { color: c, depth } => {
                if let Some(c) = c {
                    color(c)?;
                }
                if let Some(d) = depth {
                    texture(d.0)?;
                }
                Ok(())
            }
            RenderCommand::BindTexture { texture: t, .. } => texture(t.0),
            RenderCommand::BindSampler { sampler, .. } => {
                known(&self.samplers, "sampler", sampler.0)
            }
            RenderCommand::SetRasterizerState(Some(state)) => {
                known(&self.rasterizers, "rasterizer", state.0)
            }
            RenderCommand::SetDepthStencilState(Some(state)) => {
                known(&self.depth_states, "depth-stencil", state.0)
            }
            RenderCommand::SetVertexShader(shader) => {
                known(&self.shaders, "shader", shader.handle().0)
            }
            RenderCommand::SetPixelShader(Some(shader)) => {
                known(&self.shaders, "shader", shader.handle().0)
            }
            RenderCommand::DrawIndexed {
                vertex_buffer,
                index_buffer,
                ..
            } => {
                known(&self.buffers, "buffer", vertex_buffer.0)?;
                known(&self.buffers, "buffer", index_buffer.0)
            }
            _ => Ok(()),
        }
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn allocate_texture(&mut self, label: &str, width: u32, height: u32, usage: TextureUsage) -> u32 {
        let id = self.next();
        self.textures.insert(
            id,
            TextureInfo {
                label: label.to_string(),
                width,
                height,
                usage,
            },
        );
        id
    }

    fn allocate_depth(&mut self, label: &str, width: u32, height: u32) -> DepthTarget {
        let id = self.allocate_texture(label, width.max(1), height.max(1), TextureUsage::Depth);
        DepthTarget {
            depth_view: DepthViewHandle(id),
            shader_view: TextureHandle(id),
            width,
            height,
        }
    }

    fn allocate_buffer(&mut self, label: &str, kind: &'static str, size: u64) -> Result<BufferHandle, RenderError> {
        if size == 0 {
            return Err(RenderError::EmptyBuffer {
                kind,
                label: label.to_string(),
            });
        }
        let id = self.next();
        self.buffers.insert(
            id,
            BufferInfo {
                label: label.to_string(),
                size,
            },
        );
        Ok(BufferHandle(id))
    }
}

fn known<T>(map: &HashMap<u32, T>, kind: &'static str, id: u32) -> Result<(), RenderError> {
    if map.contains_key(&id) {
        Ok(())
    } else {
        Err(RenderError::UnknownHandle { kind, id })
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        vertices: &[Vertex],
    ) -> Result<BufferHandle, RenderError> {
        self.allocate_buffer(label, "vertex", std::mem::size_of_val(vertices) as u64)
    }

    fn create_index_buffer(
        &mut self,
        label: &str,
        indices: &[u32],
    ) -> Result<BufferHandle, RenderError> {
        self.allocate_buffer(label, "index", std::mem::size_of_val(indices) as u64)
    }

    fn create_texture_2d(
        &mut self,
        label: &str,
        data: &TextureData,
    ) -> Result<TextureHandle, RenderError> {
        check_texture_size(label, data.width, data.height, self.max_texture_dimension)?;
        let id = self.allocate_texture(label, data.width, data.height, TextureUsage::Sampled);
        Ok(TextureHandle(id))
    }

    fn create_cubemap(
        &mut self,
        label: &str,
        data: &CubemapData,
    ) -> Result<TextureHandle, RenderError> {
        check_texture_size(label, data.size, data.size, self.max_texture_dimension)?;
        let id = self.allocate_texture(label, data.size, data.size, TextureUsage::Cube);
        Ok(TextureHandle(id))
    }

    fn create_depth_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<DepthTarget, RenderError> {
        check_texture_size(label, width, height, self.max_texture_dimension)?;
        Ok(self.allocate_depth(label, width, height))
    }

    fn create_render_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, RenderError> {
        check_texture_size(label, width, height, self.max_texture_dimension)?;
        let id = self.allocate_texture(label, width, height, TextureUsage::RenderTarget);
        Ok(RenderTarget {
            target: RenderTargetHandle(id),
            shader_view: TextureHandle(id),
            width,
            height,
        })
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.0).is_some() {
            self.released.push(texture);
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, RenderError> {
        let id = self.next();
        self.samplers.insert(id, desc.clone());
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
        let id = self.next();
        self.shaders.insert(id, (desc.label, desc.stage));
        Ok(ShaderHandle(id))
    }

    fn back_buffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn main_depth(&self) -> DepthViewHandle {
        self.main_depth.depth_view
    }
}
