// src/gfx/rendering/replay.rs
//! Turns a recorded frame into render passes
//!
//! A [`FrameCommands`] list reads like an immediate-mode context: clears,
//! target switches, state changes and draws. wgpu wants render passes with
//! load operations decided up front and one bind group per group index, so
//! the list is first planned here, without touching the GPU:
//!
//! - a clear becomes the `LoadOp::Clear` of the next pass that uses the
//!   target, or a pass of its own if nothing draws into it
//! - a pass ends whenever the render targets change, at the UI overlay and
//!   at present
//! - constants, textures and samplers stay bound per (stage, binding) until
//!   overwritten; [`RenderCommand::UnbindPixelTextures`] drops every
//!   pixel-stage texture
//! - every constant upload is packed into one byte arena, each block starting
//!   on a [`UNIFORM_ALIGNMENT`] boundary

use std::collections::BTreeMap;
use std::sync::Arc;

use super::device::{
    BufferHandle, DepthStencilHandle, DepthViewHandle, RasterizerHandle, SamplerHandle,
    TextureHandle,
};
use super::frame::{ColorTarget, FrameCommands, RenderCommand};
use crate::gfx::resources::shader::{ShaderProgram, ShaderStage};
use crate::wgpu_utils::UNIFORM_ALIGNMENT;

/// A slice of the frame's uniform arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformRange {
    pub offset: u64,
    pub size: u64,
}

/// What one shader stage has bound at the time of a draw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageBindings {
    pub uniforms: BTreeMap<u32, UniformRange>,
    pub textures: BTreeMap<u32, TextureHandle>,
    pub samplers: BTreeMap<u32, SamplerHandle>,
}

impl StageBindings {
    fn clear_textures(&mut self) {
        self.textures.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Indexed {
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
    },
    /// Vertices generated in the shader from the vertex index
    Generated { vertex_count: u32 },
}

#[derive(Debug, Clone)]
pub struct DrawPlan {
    pub vertex_shader: Arc<ShaderProgram>,
    pub pixel_shader: Option<Arc<ShaderProgram>>,
    pub rasterizer: Option<RasterizerHandle>,
    pub depth_stencil: Option<DepthStencilHandle>,
    /// `None` covers the whole attachment
    pub viewport: Option<(u32, u32)>,
    pub vertex_bindings: StageBindings,
    pub pixel_bindings: StageBindings,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Default)]
pub struct PassPlan {
    pub color: Option<ColorTarget>,
    pub depth: Option<DepthViewHandle>,
    /// `Some` clears the color attachment on load, `None` loads it
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: Option<f32>,
    pub draws: Vec<DrawPlan>,
}

#[derive(Debug, Clone)]
pub enum Step {
    Pass(PassPlan),
    /// Hand the back buffer to the UI renderer
    Overlay,
}

#[derive(Debug, Clone, Default)]
pub struct FramePlan {
    /// Every constant block uploaded this frame, [`UNIFORM_ALIGNMENT`]-aligned
    pub uniforms: Vec<u8>,
    pub steps: Vec<Step>,
    pub presents: bool,
}

impl FramePlan {
    pub fn passes(&self) -> impl Iterator<Item = &PassPlan> {
        self.steps.iter().filter_map(|step| match step {
            Step::Pass(pass) => Some(pass),
            Step::Overlay => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.passes().map(|pass| pass.draws.len()).sum()
    }
}

#[derive(Default)]
struct Planner {
    plan: FramePlan,
    open: Option<PassPlan>,
    color: Option<ColorTarget>,
    depth: Option<DepthViewHandle>,
    viewport: Option<(u32, u32)>,
    vertex_shader: Option<Arc<ShaderProgram>>,
    pixel_shader: Option<Arc<ShaderProgram>>,
    rasterizer: Option<RasterizerHandle>,
    depth_stencil: Option<DepthStencilHandle>,
    vertex: StageBindings,
    pixel: StageBindings,
    pending_color: Vec<(ColorTarget, [f32; 4])>,
    pending_depth: Vec<(DepthViewHandle, f32)>,
}

impl Planner {
    fn stage(&mut self, stage: ShaderStage) -> &mut StageBindings {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Pixel => &mut self.pixel,
        }
    }

    fn close_pass(&mut self) {
        if let Some(pass) = self.open.take() {
            self.plan.steps.push(Step::Pass(pass));
        }
    }

    fn push_uniforms(&mut self, data: &[u8]) -> UniformRange {
        let offset = self.plan.uniforms.len().next_multiple_of(UNIFORM_ALIGNMENT as usize);
        self.plan.uniforms.resize(offset, 0);
        self.plan.uniforms.extend_from_slice(data);
        UniformRange {
            offset: offset as u64,
            size: data.len() as u64,
        }
    }

    fn open_pass(&mut self) -> &mut PassPlan {
        let color = self.color;
        let depth = self.depth;
        let clear_color = color.and_then(|target| take(&mut self.pending_color, target));
        let clear_depth = depth.and_then(|target| take(&mut self.pending_depth, target));
        self.open.get_or_insert(PassPlan {
            color,
            depth,
            clear_color,
            clear_depth,
            draws: Vec::new(),
        })
    }

    fn draw(&mut self, geometry: Geometry) {
        let Some(vertex_shader) = self.vertex_shader.clone() else {
            log::warn!("draw with no vertex shader bound, skipped");
            return;
        };
        if self.color.is_none() && self.depth.is_none() {
            log::warn!("draw with no render target bound, skipped");
            return;
        }
        let draw = DrawPlan {
            vertex_shader,
            pixel_shader: self.pixel_shader.clone(),
            rasterizer: self.rasterizer,
            depth_stencil: self.depth_stencil,
            viewport: self.viewport,
            vertex_bindings: self.vertex.clone(),
            pixel_bindings: self.pixel.clone(),
            geometry,
        };
        self.open_pass().draws.push(draw);
    }

    fn apply(&mut self, command: &RenderCommand) {
        match command {
            RenderCommand::ClearColor { target, color } => {
                if self.open.as_ref().is_some_and(|pass| pass.color == Some(*target)) {
                    self.close_pass();
                }
                self.pending_color.retain(|(t, _)| t != target);
                self.pending_color.push((*target, *color));
            }
            RenderCommand::ClearDepth { target, depth } => {
                if self.open.as_ref().is_some_and(|pass| pass.depth == Some(*target)) {
                    self.close_pass();
                }
                self.pending_depth.retain(|(t, _)| t != target);
                self.pending_depth.push((*target, *depth));
            }
            RenderCommand::SetRenderTargets { color, depth } => {
                if self.open.is_some() && (self.color != *color || self.depth != *depth) {
                    self.close_pass();
                }
                self.color = *color;
                self.depth = *depth;
            }
            RenderCommand::SetViewport { width, height } => {
                self.viewport = Some((*width, *height));
            }
            RenderCommand::SetVertexShader(shader) => {
                self.vertex_shader = Some(Arc::clone(shader));
            }
            RenderCommand::SetPixelShader(shader) => self.pixel_shader = shader.clone(),
            RenderCommand::SetRasterizerState(state) => self.rasterizer = *state,
            RenderCommand::SetDepthStencilState(state) => self.depth_stencil = *state,
            RenderCommand::SetConstants {
                stage,
                binding,
                data,
            } => {
                let range = self.push_uniforms(data);
                self.stage(*stage).uniforms.insert(*binding, range);
            }
            RenderCommand::BindTexture {
                stage,
                binding,
                texture,
            } => {
                self.stage(*stage).textures.insert(*binding, *texture);
            }
            RenderCommand::BindSampler {
                stage,
                binding,
                sampler,
            } => {
                self.stage(*stage).samplers.insert(*binding, *sampler);
            }
            RenderCommand::UnbindPixelTextures => self.pixel.clear_textures(),
            RenderCommand::DrawIndexed {
                vertex_buffer,
                index_buffer,
                index_count,
            } => self.draw(Geometry::Indexed {
                vertex_buffer: *vertex_buffer,
                index_buffer: *index_buffer,
                index_count: *index_count,
            }),
            RenderCommand::Draw { vertex_count } => self.draw(Geometry::Generated {
                vertex_count: *vertex_count,
            }),
            RenderCommand::DrawOverlay => {
                self.close_pass();
                self.plan.steps.push(Step::Overlay);
            }
            RenderCommand::Present => {
                self.close_pass();
                self.plan.presents = true;
            }
        }
    }

    fn finish(mut self) -> FramePlan {
        self.close_pass();
        // Clears nothing drew into still happen
        for (target, color) in std::mem::take(&mut self.pending_color) {
            self.plan.steps.push(Step::Pass(PassPlan {
                color: Some(target),
                clear_color: Some(color),
                ..Default::default()
            }));
        }
        for (target, depth) in std::mem::take(&mut self.pending_depth) {
            self.plan.steps.push(Step::Pass(PassPlan {
                depth: Some(target),
                clear_depth: Some(depth),
                ..Default::default()
            }));
        }
        self.plan
    }
}

fn take<K: PartialEq + Copy, V: Copy>(pending: &mut Vec<(K, V)>, key: K) -> Option<V> {
    let index = pending.iter().position(|(k, _)| *k == key)?;
    Some(pending.remove(index).1)
}

pub fn plan_frame(frame: &FrameCommands) -> FramePlan {
    let mut planner = Planner::default();
    for command in frame.commands() {
        planner.apply(command);
    }
    planner.finish()
}
