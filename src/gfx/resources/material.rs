// src/gfx/resources/material.rs
//! Material system
//!
//! A material pairs a vertex and pixel shader with the surface inputs the
//! pixel stage reads: a color tint, a roughness scalar and any number of
//! named textures and samplers. Materials live in a [`MaterialLibrary`] and
//! entities refer to them by ID, so one material is shared by every entity
//! that uses it.

use cgmath::Vector4;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::gfx::rendering::device::{SamplerHandle, TextureHandle};
use crate::gfx::rendering::frame::FrameRecorder;
use crate::gfx::resources::shader::{ShaderParameters, ShaderProgram};

/// Material ID for referencing materials
pub type MaterialId = String;

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    vertex_shader: Arc<ShaderProgram>,
    pixel_shader: Arc<ShaderProgram>,
    pub color_tint: Vector4<f32>,
    pub roughness: f32,
    textures: BTreeMap<String, TextureHandle>,
    samplers: BTreeMap<String, SamplerHandle>,
}

impl Material {
    /// Creates a material with no textures or samplers
    ///
    /// # Arguments
    /// * `name` - Name, also the ID in a [`MaterialLibrary`]
    /// * `vertex_shader` - Program for the vertex stage
    /// * `pixel_shader` - Program for the pixel stage
    /// * `color_tint` - RGBA multiplier applied to the albedo
    /// * `roughness` - Scalar passed to the pixel stage as is
    pub fn new(
        name: &str,
        vertex_shader: Arc<ShaderProgram>,
        pixel_shader: Arc<ShaderProgram>,
        color_tint: impl Into<Vector4<f32>>,
        roughness: f32,
    ) -> Self {
        Self {
            name: name.to_string(),
            vertex_shader,
            pixel_shader,
            color_tint: color_tint.into(),
            roughness,
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }

    /// Builder pattern: register a texture
    pub fn with_texture(mut self, name: &str, texture: TextureHandle) -> Self {
        self.add_texture_srv(name, texture);
        self
    }

    /// Builder pattern: register a sampler
    pub fn with_sampler(mut self, name: &str, sampler: SamplerHandle) -> Self {
        self.add_sampler(name, sampler);
        self
    }

    /// Registers a texture under a shader slot name
    ///
    /// # Arguments
    /// * `name` - Slot name as declared by the pixel shader
    /// * `texture` - Texture to bind there
    ///
    /// # Returns
    /// The texture previously registered under `name`, if any
    pub fn add_texture_srv(&mut self, name: &str, texture: TextureHandle) -> Option<TextureHandle> {
        self.textures.insert(name.to_string(), texture)
    }

    /// Registers a sampler under a shader slot name, replacing and returning
    /// any sampler already registered under it
    pub fn add_sampler(&mut self, name: &str, sampler: SamplerHandle) -> Option<SamplerHandle> {
        self.samplers.insert(name.to_string(), sampler)
    }

    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    pub fn sampler(&self, name: &str) -> Option<SamplerHandle> {
        self.samplers.get(name).copied()
    }

    /// Registered textures in name order
    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureHandle)> {
        self.textures.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn samplers(&self) -> impl Iterator<Item = (&str, SamplerHandle)> {
        self.samplers.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn vertex_shader(&self) -> &Arc<ShaderProgram> {
        &self.vertex_shader
    }

    pub fn pixel_shader(&self) -> &Arc<ShaderProgram> {
        &self.pixel_shader
    }

    pub fn set_vertex_shader(&mut self, shader: Arc<ShaderProgram>) {
        self.vertex_shader = shader;
    }

    pub fn set_pixel_shader(&mut self, shader: Arc<ShaderProgram>) {
        self.pixel_shader = shader;
    }

    /// Makes this material's shader pair current
    pub fn bind(&self, recorder: &mut FrameRecorder) {
        recorder.set_vertex_shader(&self.vertex_shader);
        recorder.set_pixel_shader(Some(&self.pixel_shader));
    }

    /// Stages tint, roughness and every registered texture and sampler into
    /// pixel-shader parameters. Slots the shader lacks are skipped.
    pub fn prepare(&self, params: &mut ShaderParameters) {
        params.set_float4("color_tint", self.color_tint);
        params.set_float("roughness", self.roughness);
        for (name, texture) in &self.textures {
            params.set_shader_resource_view(name, *texture);
        }
        for (name, sampler) in &self.samplers {
            params.set_sampler_state(name, *sampler);
        }
    }
}

/// Central material storage
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: HashMap<MaterialId, Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a material, replacing any material with the same name
    ///
    /// # Returns
    /// The ID to look the material up with
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = material.name.clone();
        if self.materials.insert(id.clone(), material).is_some() {
            log::debug!("material '{}' replaced", id);
        }
        id
    }

    pub fn get(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Material IDs in sorted order
    pub fn ids(&self) -> Vec<&MaterialId> {
        let mut ids: Vec<_> = self.materials.keys().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::frame::RenderCommand;
    use crate::gfx::rendering::headless::HeadlessDevice;
    use crate::gfx::resources::shader::{
        SamplerKind, ShaderDesc, ShaderStage, TextureKind, UniformKind, UniformLayout,
    };

    fn shaders() -> (Arc<ShaderProgram>, Arc<ShaderProgram>) {
        let mut device = HeadlessDevice::new(64, 64);
        let vs = ShaderProgram::load(&mut device, ShaderDesc::vertex("vs", "", "vs_main")).unwrap();
        let ps = ShaderProgram::load(
            &mut device,
            ShaderDesc::pixel("ps", "", "fs_main")
                .uniform_block(
                    "material",
                    0,
                    UniformLayout::builder()
                        .field("color_tint", UniformKind::Float4)
                        .field("roughness", UniformKind::Float)
                        .build(),
                )
                .texture("albedo", 1, TextureKind::Color2d)
                .sampler("basic_sampler", 2, SamplerKind::Filtering),
        )
        .unwrap();
        (vs, ps)
    }

    #[test]
    fn test_reregistering_replaces() {
        let (vs, ps) = shaders();
        let mut material = Material::new("m", vs, ps, [1.0, 1.0, 1.0, 1.0], 0.5);
        assert_eq!(material.add_texture_srv("albedo", TextureHandle(1)), None);
        assert_eq!(
            material.add_texture_srv("albedo", TextureHandle(2)),
            Some(TextureHandle(1))
        );
        assert_eq!(material.texture("albedo"), Some(TextureHandle(2)));
        assert_eq!(material.textures().count(), 1);
    }

    #[test]
    fn test_prepare_skips_unknown_slots() {
        let (vs, ps) = shaders();
        let material = Material::new("m", vs, Arc::clone(&ps), [0.3, 1.0, 1.0, 1.0], 0.8)
            .with_texture("albedo", TextureHandle(5))
            .with_texture("normal_map", TextureHandle(6))
            .with_sampler("basic_sampler", SamplerHandle(9));

        let mut params = ps.parameters();
        material.prepare(&mut params);
        let mut recorder = FrameRecorder::new();
        material.bind(&mut recorder);
        params.copy_all_buffer_data(&mut recorder);
        let frame = recorder.finish();
        let commands = frame.commands();

        assert!(matches!(commands[0], RenderCommand::SetVertexShader(_)));
        assert!(matches!(commands[1], RenderCommand::SetPixelShader(Some(_))));
        assert!(matches!(commands[2], RenderCommand::SetConstants { binding: 0, .. }));
        assert_eq!(
            commands[3],
            RenderCommand::BindTexture {
                stage: ShaderStage::Pixel,
                binding: 1,
                texture: TextureHandle(5)
            }
        );
        assert_eq!(
            commands[4],
            RenderCommand::BindSampler {
                stage: ShaderStage::Pixel,
                binding: 2,
                sampler: SamplerHandle(9)
            }
        );
        assert_eq!(commands.len(), 5);
    }

    #[test]
    fn test_roughness_reaches_shader_unchanged() {
        let (vs, ps) = shaders();
        let mut material = Material::new("m", vs, Arc::clone(&ps), [1.0; 4], 3.0);
        assert_eq!(material.roughness, 3.0);
        material.roughness = -0.5;

        let mut params = ps.parameters();
        material.prepare(&mut params);
        let mut recorder = FrameRecorder::new();
        params.copy_all_buffer_data(&mut recorder);
        let frame = recorder.finish();
        let RenderCommand::SetConstants { data, .. } = &frame.commands()[0] else {
            panic!("expected constants, got {:?}", frame.commands()[0]);
        };
        // color_tint is 16 bytes, roughness follows
        assert_eq!(&data[16..20], &(-0.5f32).to_le_bytes());
    }

    #[test]
    fn test_library_lookup() {
        let (vs, ps) = shaders();
        let mut library = MaterialLibrary::new();
        library.add_material(Material::new("b", Arc::clone(&vs), Arc::clone(&ps), [1.0; 4], 0.2));
        let id = library.add_material(Material::new("a", vs, ps, [1.0; 4], 0.2));
        assert_eq!(id, "a");
        assert_eq!(library.ids(), vec!["a", "b"]);
        assert!(library.get("missing").is_none());
    }
}
