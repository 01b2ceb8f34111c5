// src/gfx/scene/entity.rs
//! Drawable scene entities

use cgmath::{Matrix4, SquareMatrix};
use std::sync::Arc;

use crate::gfx::rendering::device::{SamplerHandle, TextureHandle};
use crate::gfx::rendering::frame::FrameRecorder;
use crate::gfx::resources::material::{MaterialId, MaterialLibrary};
use crate::gfx::resources::shader::ShaderParameters;
use crate::gfx::scene::mesh::Mesh;
use crate::gfx::transform::Transform;

/// Per-frame values every entity draw needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawContext {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub light_view: Matrix4<f32>,
    pub light_projection: Matrix4<f32>,
    pub shadow_map: TextureHandle,
    pub shadow_sampler: SamplerHandle,
}

impl DrawContext {
    /// Identity matrices; callers fill in what they have
    pub fn new(shadow_map: TextureHandle, shadow_sampler: SamplerHandle) -> Self {
        Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            light_view: Matrix4::identity(),
            light_projection: Matrix4::identity(),
            shadow_map,
            shadow_sampler,
        }
    }
}

/// A mesh placed in the world with a material
///
/// The transform belongs to the entity. The mesh is shared and the material
/// is looked up by ID, so dropping an entity never frees either.
#[derive(Debug)]
pub struct Entity {
    pub name: String,
    mesh: Arc<Mesh>,
    material: MaterialId,
    transform: Transform,
}

impl Entity {
    pub fn new(name: &str, mesh: Arc<Mesh>, material: impl Into<MaterialId>) -> Self {
        Self {
            name: name.to_string(),
            mesh,
            material: material.into(),
            transform: Transform::new(),
        }
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn material_id(&self) -> &str {
        &self.material
    }

    pub fn set_material(&mut self, material: impl Into<MaterialId>) {
        self.material = material.into();
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Color-pass draw. Returns false when the material ID is unknown, in
    /// which case nothing is recorded.
    pub fn draw(
        &mut self,
        recorder: &mut FrameRecorder,
        materials: &MaterialLibrary,
        context: &DrawContext,
    ) -> bool {
        let Some(material) = materials.get(&self.material) else {
            log::trace!("skipping '{}': no material '{}'", self.name, self.material);
            return false;
        };

        material.bind(recorder);

        let mut vs = material.vertex_shader().parameters();
        vs.set_matrix4x4("world", self.transform.world_matrix());
        vs.set_matrix4x4("view", context.view);
        vs.set_matrix4x4("projection", context.projection);
        vs.set_matrix4x4("light_view", context.light_view);
        vs.set_matrix4x4("light_projection", context.light_projection);
        vs.set_matrix4x4(
            "world_inverse_transpose",
            self.transform.world_inverse_transpose_matrix(),
        );

        let mut ps = material.pixel_shader().parameters();
        material.prepare(&mut ps);
        ps.set_shader_resource_view("shadow_map", context.shadow_map);
        ps.set_sampler_state("shadow_sampler", context.shadow_sampler);

        vs.copy_all_buffer_data(recorder);
        ps.copy_all_buffer_data(recorder);
        self.mesh.draw(recorder);
        true
    }

    /// Depth-only draw. The caller has bound the shadow vertex shader and
    /// staged the light's view and projection in `shadow_vs`.
    pub fn draw_depth(&mut self, recorder: &mut FrameRecorder, shadow_vs: &mut ShaderParameters) {
        shadow_vs.set_matrix4x4("world", self.transform.world_matrix());
        shadow_vs.copy_all_buffer_data(recorder);
        self.mesh.draw(recorder);
    }
}
