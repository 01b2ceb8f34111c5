// src/gfx/resources/shader.rs
//! Shader programs with named parameters
//!
//! A [`ShaderProgram`] pairs a compiled device handle with a reflection
//! table describing its uniform blocks, textures and samplers. Callers
//! write values by name into a [`ShaderParameters`] staging object and then
//! flush everything that was written with
//! [`ShaderParameters::copy_all_buffer_data`]. Names the program does not
//! declare are ignored.
//!
//! Bind group convention: vertex-stage resources live in `@group(0)`,
//! pixel-stage resources in `@group(1)`.

use cgmath::{Matrix4, Vector3, Vector4};
use std::sync::Arc;

use crate::error::RenderError;
use crate::gfx::rendering::device::{RenderDevice, SamplerHandle, ShaderHandle, TextureHandle};
use crate::gfx::rendering::frame::FrameRecorder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    pub fn bind_group(self) -> u32 {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
        }
    }
}

/// What the vertex stage reads from vertex buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInput {
    /// Full [`Vertex`](crate::gfx::scene::vertex::Vertex) layout
    Mesh,
    /// Generated from the vertex index (full-screen triangle)
    None,
}

/// WGSL uniform member types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
    Float2,
    Float3,
    Float4,
    Matrix4,
    /// Array of structs or vectors; `stride` must be a multiple of 16
    Array { stride: u32, count: u32 },
}

impl UniformKind {
    pub fn align(self) -> u32 {
        match self {
            UniformKind::Float | UniformKind::Int | UniformKind::UInt => 4,
            UniformKind::Float2 => 8,
            UniformKind::Float3 | UniformKind::Float4 | UniformKind::Matrix4 => 16,
            UniformKind::Array { .. } => 16,
        }
    }

    pub fn size(self) -> u32 {
        match self {
            UniformKind::Float | UniformKind::Int | UniformKind::UInt => 4,
            UniformKind::Float2 => 8,
            UniformKind::Float3 => 12,
            UniformKind::Float4 => 16,
            UniformKind::Matrix4 => 64,
            UniformKind::Array { stride, count } => stride * count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: &'static str,
    pub kind: UniformKind,
    pub offset: u32,
}

/// Byte layout of one uniform block, following WGSL uniform address space rules
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: u32,
}

impl UniformLayout {
    pub fn builder() -> UniformLayoutBuilder {
        UniformLayoutBuilder::default()
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Total size, rounded up to 16 bytes
    pub fn size(&self) -> u32 {
        self.size
    }
}

#[derive(Debug, Default)]
pub struct UniformLayoutBuilder {
    fields: Vec<UniformField>,
    cursor: u32,
}

impl UniformLayoutBuilder {
    pub fn field(mut self, name: &'static str, kind: UniformKind) -> Self {
        let offset = align_to(self.cursor, kind.align());
        self.fields.push(UniformField { name, kind, offset });
        self.cursor = offset + kind.size();
        self
    }

    pub fn build(self) -> UniformLayout {
        UniformLayout {
            size: align_to(self.cursor.max(16), 16),
            fields: self.fields,
        }
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockDesc {
    pub name: &'static str,
    pub binding: u32,
    pub layout: UniformLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Color2d,
    Depth2d,
    Cube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Filtering,
    Comparison,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: &'static str,
    pub binding: u32,
    pub kind: TextureKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerSlot {
    pub name: &'static str,
    pub binding: u32,
    pub kind: SamplerKind,
}

/// Source plus reflection for one shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDesc {
    pub label: &'static str,
    pub source: &'static str,
    pub entry_point: &'static str,
    pub stage: ShaderStage,
    pub vertex_input: VertexInput,
    pub uniform_blocks: Vec<UniformBlockDesc>,
    pub textures: Vec<TextureSlot>,
    pub samplers: Vec<SamplerSlot>,
}

impl ShaderDesc {
    pub fn vertex(label: &'static str, source: &'static str, entry_point: &'static str) -> Self {
        Self::new(label, source, entry_point, ShaderStage::Vertex)
    }

    pub fn pixel(label: &'static str, source: &'static str, entry_point: &'static str) -> Self {
        Self::new(label, source, entry_point, ShaderStage::Pixel)
    }

    fn new(
        label: &'static str,
        source: &'static str,
        entry_point: &'static str,
        stage: ShaderStage,
    ) -> Self {
        Self {
            label,
            source,
            entry_point,
            stage,
            vertex_input: VertexInput::Mesh,
            uniform_blocks: Vec::new(),
            textures: Vec::new(),
            samplers: Vec::new(),
        }
    }

    pub fn without_vertex_input(mut self) -> Self {
        self.vertex_input = VertexInput::None;
        self
    }

    pub fn uniform_block(mut self, name: &'static str, binding: u32, layout: UniformLayout) -> Self {
        self.uniform_blocks.push(UniformBlockDesc {
            name,
            binding,
            layout,
        });
        self
    }

    pub fn texture(mut self, name: &'static str, binding: u32, kind: TextureKind) -> Self {
        self.textures.push(TextureSlot {
            name,
            binding,
            kind,
        });
        self
    }

    pub fn sampler(mut self, name: &'static str, binding: u32, kind: SamplerKind) -> Self {
        self.samplers.push(SamplerSlot {
            name,
            binding,
            kind,
        });
        self
    }
}

/// A compiled shader stage, shared between materials as `Arc<ShaderProgram>`
#[derive(Debug)]
pub struct ShaderProgram {
    handle: ShaderHandle,
    desc: ShaderDesc,
}

/// Programs compare by device handle
impl PartialEq for ShaderProgram {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl ShaderProgram {
    pub fn load(
        device: &mut dyn RenderDevice,
        desc: ShaderDesc,
    ) -> Result<Arc<Self>, RenderError> {
        let handle = device.create_shader(&desc)?;
        log::debug!("loaded shader '{}' ({:?})", desc.label, desc.stage);
        Ok(Arc::new(Self { handle, desc }))
    }

    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }

    pub fn stage(&self) -> ShaderStage {
        self.desc.stage
    }

    pub fn label(&self) -> &'static str {
        self.desc.label
    }

    pub fn desc(&self) -> &ShaderDesc {
        &self.desc
    }

    /// Finds the block and field that declare a variable name
    fn find_variable(&self, name: &str) -> Option<(usize, &UniformField)> {
        self.desc
            .uniform_blocks
            .iter()
            .enumerate()
            .find_map(|(i, block)| block.layout.field(name).map(|f| (i, f)))
    }

    pub fn texture_binding(&self, name: &str) -> Option<u32> {
        self.desc
            .textures
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.binding)
    }

    pub fn sampler_binding(&self, name: &str) -> Option<u32> {
        self.desc
            .samplers
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.binding)
    }

    /// Fresh, zeroed staging storage for this program's parameters
    pub fn parameters(self: &Arc<Self>) -> ShaderParameters {
        ShaderParameters {
            blocks: self
                .desc
                .uniform_blocks
                .iter()
                .map(|b| StagedBlock {
                    data: vec![0; b.layout.size() as usize],
                    written: false,
                })
                .collect(),
            textures: Vec::new(),
            samplers: Vec::new(),
            program: Arc::clone(self),
        }
    }
}

#[derive(Debug, Clone)]
struct StagedBlock {
    data: Vec<u8>,
    written: bool,
}

/// CPU-side staging for one draw's worth of shader inputs
#[derive(Debug, Clone)]
pub struct ShaderParameters {
    program: Arc<ShaderProgram>,
    blocks: Vec<StagedBlock>,
    textures: Vec<(u32, TextureHandle)>,
    samplers: Vec<(u32, SamplerHandle)>,
}

impl ShaderParameters {
    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    pub fn set_matrix4x4(&mut self, name: &str, value: Matrix4<f32>) -> bool {
        let columns: [[f32; 4]; 4] = value.into();
        self.write(name, bytemuck::cast_slice(&columns))
    }

    pub fn set_float4(&mut self, name: &str, value: impl Into<Vector4<f32>>) -> bool {
        let v: Vector4<f32> = value.into();
        let v: [f32; 4] = v.into();
        self.write(name, bytemuck::cast_slice(&v))
    }

    pub fn set_float3(&mut self, name: &str, value: impl Into<Vector3<f32>>) -> bool {
        let v: Vector3<f32> = value.into();
        let v: [f32; 3] = v.into();
        self.write(name, bytemuck::cast_slice(&v))
    }

    pub fn set_float2(&mut self, name: &str, value: [f32; 2]) -> bool {
        self.write(name, bytemuck::cast_slice(&value))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.write(name, bytemuck::bytes_of(&value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.write(name, bytemuck::bytes_of(&value))
    }

    pub fn set_uint(&mut self, name: &str, value: u32) -> bool {
        self.write(name, bytemuck::bytes_of(&value))
    }

    /// Raw bytes for arrays and structs; truncated to the field's size
    pub fn set_data(&mut self, name: &str, bytes: &[u8]) -> bool {
        self.write(name, bytes)
    }

    pub fn set_shader_resource_view(&mut self, name: &str, texture: TextureHandle) -> bool {
        let Some(binding) = self.program.texture_binding(name) else {
            log::trace!("{}: no texture named '{}'", self.program.label(), name);
            return false;
        };
        self.textures.retain(|(b, _)| *b != binding);
        self.textures.push((binding, texture));
        true
    }

    pub fn set_sampler_state(&mut self, name: &str, sampler: SamplerHandle) -> bool {
        let Some(binding) = self.program.sampler_binding(name) else {
            log::trace!("{}: no sampler named '{}'", self.program.label(), name);
            return false;
        };
        self.samplers.retain(|(b, _)| *b != binding);
        self.samplers.push((binding, sampler));
        true
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> bool {
        let Some((block, field)) = self.program.find_variable(name) else {
            log::trace!("{}: no variable named '{}'", self.program.label(), name);
            return false;
        };
        let start = field.offset as usize;
        let len = bytes.len().min(field.kind.size() as usize);
        let staged = &mut self.blocks[block];
        staged.data[start..start + len].copy_from_slice(&bytes[..len]);
        staged.written = true;
        true
    }

    /// Records every written uniform block and every staged texture and
    /// sampler binding, then clears the written state
    pub fn copy_all_buffer_data(&mut self, recorder: &mut FrameRecorder) {
        let stage = self.program.stage();
        for (staged, desc) in self.blocks.iter_mut().zip(&self.program.desc.uniform_blocks) {
            if staged.written {
                recorder.set_constants(stage, desc.binding, staged.data.clone());
                staged.written = false;
            }
        }
        for (binding, texture) in self.textures.drain(..) {
            recorder.bind_texture(stage, binding, texture);
        }
        for (binding, sampler) in self.samplers.drain(..) {
            recorder.bind_sampler(stage, binding, sampler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::frame::RenderCommand;
    use crate::gfx::rendering::headless::HeadlessDevice;

    fn light_block() -> UniformLayout {
        UniformLayout::builder()
            .field("lights", UniformKind::Array { stride: 64, count: 8 })
            .field("ambient_color", UniformKind::Float3)
            .field("light_count", UniformKind::UInt)
            .field("camera_position", UniformKind::Float3)
            .build()
    }

    fn test_program() -> Arc<ShaderProgram> {
        let mut device = HeadlessDevice::new(64, 64);
        let desc = ShaderDesc::pixel("test_ps", "", "fs_main")
            .uniform_block(
                "per_draw",
                0,
                UniformLayout::builder()
                    .field("color_tint", UniformKind::Float4)
                    .field("roughness", UniformKind::Float)
                    .build(),
            )
            .uniform_block("per_frame", 1, light_block())
            .texture("albedo", 0, TextureKind::Color2d)
            .sampler("basic_sampler", 1, SamplerKind::Filtering);
        ShaderProgram::load(&mut device, desc).unwrap()
    }

    #[test]
    fn test_layout_follows_wgsl_alignment() {
        let layout = UniformLayout::builder()
            .field("a", UniformKind::Float)
            .field("b", UniformKind::Float3)
            .field("c", UniformKind::Float)
            .field("m", UniformKind::Matrix4)
            .field("d", UniformKind::Float2)
            .build();

        assert_eq!(layout.field("a").unwrap().offset, 0);
        assert_eq!(layout.field("b").unwrap().offset, 16);
        // A scalar packs into the vec3's trailing padding
        assert_eq!(layout.field("c").unwrap().offset, 28);
        assert_eq!(layout.field("m").unwrap().offset, 32);
        assert_eq!(layout.field("d").unwrap().offset, 96);
        assert_eq!(layout.size(), 112);

        let lights = light_block();
        assert_eq!(lights.field("ambient_color").unwrap().offset, 512);
        assert_eq!(lights.field("light_count").unwrap().offset, 524);
        assert_eq!(lights.field("camera_position").unwrap().offset, 528);
        assert_eq!(lights.size(), 544);
    }

    #[test]
    fn test_missing_names_are_noops() {
        let program = test_program();
        let mut params = program.parameters();

        assert!(!params.set_float("not_there", 1.0));
        assert!(!params.set_shader_resource_view("normal_map", TextureHandle(7)));
        assert!(!params.set_sampler_state("shadow_sampler", SamplerHandle(3)));

        let mut recorder = FrameRecorder::new();
        params.copy_all_buffer_data(&mut recorder);
        assert!(recorder.finish().commands().is_empty());
    }

    #[test]
    fn test_only_written_blocks_are_flushed() {
        let program = test_program();
        let mut params = program.parameters();
        assert!(params.set_float4("color_tint", [1.0, 0.5, 0.25, 1.0]));
        assert!(params.set_float("roughness", 0.8));
        assert!(params.set_shader_resource_view("albedo", TextureHandle(4)));

        let mut recorder = FrameRecorder::new();
        params.copy_all_buffer_data(&mut recorder);
        let frame = recorder.finish();
        let commands = frame.commands();
        assert_eq!(commands.len(), 2);

        match &commands[0] {
            RenderCommand::SetConstants {
                stage,
                binding,
                data,
            } => {
                assert_eq!(*stage, ShaderStage::Pixel);
                assert_eq!(*binding, 0);
                let floats: Vec<f32> = data
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                assert_eq!(&floats[..5], &[1.0, 0.5, 0.25, 1.0, 0.8]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            commands[1],
            RenderCommand::BindTexture {
                stage: ShaderStage::Pixel,
                binding: 0,
                texture: TextureHandle(4)
            }
        );

        // Nothing left to flush until something is written again
        let mut recorder = FrameRecorder::new();
        params.copy_all_buffer_data(&mut recorder);
        assert!(recorder.finish().commands().is_empty());
    }

    #[test]
    fn test_set_data_truncates_to_field() {
        let program = test_program();
        let mut params = program.parameters();
        let too_long = vec![0xFFu8; 4096];
        assert!(params.set_data("lights", &too_long));

        let mut recorder = FrameRecorder::new();
        params.copy_all_buffer_data(&mut recorder);
        let frame = recorder.finish();
        match &frame.commands()[0] {
            RenderCommand::SetConstants { binding, data, .. } => {
                assert_eq!(*binding, 1);
                assert_eq!(data.len(), 544);
                assert!(data[..512].iter().all(|&b| b == 0xFF));
                assert!(data[512..].iter().all(|&b| b == 0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
