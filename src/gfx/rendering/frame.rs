// src/gfx/rendering/frame.rs
//! Recorded frame commands
//!
//! Draw code records an ordered list of [`RenderCommand`]s, the same state
//! changes an immediate-mode device context would receive. Backends replay
//! the list; tests inspect it.

use super::device::{
    BufferHandle, DepthStencilHandle, DepthViewHandle, RasterizerHandle, RenderTargetHandle,
    SamplerHandle, TextureHandle,
};
use crate::gfx::resources::shader::{ShaderProgram, ShaderStage};
use crate::gfx::scene::mesh::Mesh;
use std::sync::Arc;

/// Where color output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTarget {
    /// The swap-chain image being presented this frame
    BackBuffer,
    Texture(RenderTargetHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    ClearColor {
        target: ColorTarget,
        color: [f32; 4],
    },
    ClearDepth {
        target: DepthViewHandle,
        depth: f32,
    },
    SetRenderTargets {
        color: Option<ColorTarget>,
        depth: Option<DepthViewHandle>,
    },
    SetViewport {
        width: u32,
        height: u32,
    },
    SetVertexShader(Arc<ShaderProgram>),
    /// `None` disables the pixel stage (depth-only rendering)
    SetPixelShader(Option<Arc<ShaderProgram>>),
    /// `None` restores the default rasterizer state
    SetRasterizerState(Option<RasterizerHandle>),
    /// `None` restores the default depth-stencil state
    SetDepthStencilState(Option<DepthStencilHandle>),
    SetConstants {
        stage: ShaderStage,
        binding: u32,
        data: Vec<u8>,
    },
    BindTexture {
        stage: ShaderStage,
        binding: u32,
        texture: TextureHandle,
    },
    BindSampler {
        stage: ShaderStage,
        binding: u32,
        sampler: SamplerHandle,
    },
    /// Clears every pixel-stage texture binding
    UnbindPixelTextures,
    DrawIndexed {
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
    },
    /// Non-indexed draw with no vertex buffer bound
    Draw {
        vertex_count: u32,
    },
    /// Hands the back buffer to the UI renderer
    DrawOverlay,
    Present,
}

/// An immutable, replayable frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameCommands {
    commands: Vec<RenderCommand>,
}

impl FrameCommands {
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Index of the first command matching `predicate`
    pub fn position<F>(&self, predicate: F) -> Option<usize>
    where
        F: Fn(&RenderCommand) -> bool,
    {
        self.commands.iter().position(predicate)
    }
}

/// Serial command recording context for one frame
#[derive(Debug, Default)]
pub struct FrameRecorder {
    commands: Vec<RenderCommand>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_color(&mut self, target: ColorTarget, color: [f32; 4]) {
        self.commands.push(RenderCommand::ClearColor { target, color });
    }

    pub fn clear_depth(&mut self, target: DepthViewHandle, depth: f32) {
        self.commands.push(RenderCommand::ClearDepth { target, depth });
    }

    pub fn set_render_targets(&mut self, color: Option<ColorTarget>, depth: Option<DepthViewHandle>) {
        self.commands
            .push(RenderCommand::SetRenderTargets { color, depth });
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands
            .push(RenderCommand::SetViewport { width, height });
    }

    pub fn set_vertex_shader(&mut self, shader: &Arc<ShaderProgram>) {
        self.commands
            .push(RenderCommand::SetVertexShader(Arc::clone(shader)));
    }

    pub fn set_pixel_shader(&mut self, shader: Option<&Arc<ShaderProgram>>) {
        self.commands
            .push(RenderCommand::SetPixelShader(shader.cloned()));
    }

    pub fn set_rasterizer_state(&mut self, state: Option<RasterizerHandle>) {
        self.commands
            .push(RenderCommand::SetRasterizerState(state));
    }

    pub fn set_depth_stencil_state(&mut self, state: Option<DepthStencilHandle>) {
        self.commands
            .push(RenderCommand::SetDepthStencilState(state));
    }

    pub fn set_constants(&mut self, stage: ShaderStage, binding: u32, data: Vec<u8>) {
        self.commands.push(RenderCommand::SetConstants {
            stage,
            binding,
            data,
        });
    }

    pub fn bind_texture(&mut self, stage: ShaderStage, binding: u32, texture: TextureHandle) {
        self.commands.push(RenderCommand::BindTexture {
            stage,
            binding,
            texture,
        });
    }

    pub fn bind_sampler(&mut self, stage: ShaderStage, binding: u32, sampler: SamplerHandle) {
        self.commands.push(RenderCommand::BindSampler {
            stage,
            binding,
            sampler,
        });
    }

    pub fn unbind_pixel_textures(&mut self) {
        self.commands.push(RenderCommand::UnbindPixelTextures);
    }

    pub fn draw_mesh(&mut self, mesh: &Mesh) {
        self.commands.push(RenderCommand::DrawIndexed {
            vertex_buffer: mesh.vertex_buffer(),
            index_buffer: mesh.index_buffer(),
            index_count: mesh.index_count(),
        });
    }

    pub fn draw(&mut self, vertex_count: u32) {
        self.commands.push(RenderCommand::Draw { vertex_count });
    }

    pub fn draw_overlay(&mut self) {
        self.commands.push(RenderCommand::DrawOverlay);
    }

    pub fn present(&mut self) {
        self.commands.push(RenderCommand::Present);
    }

    pub fn finish(self) -> FrameCommands {
        FrameCommands {
            commands: self.commands,
        }
    }
}
