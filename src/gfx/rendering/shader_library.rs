// src/gfx/rendering/shader_library.rs
//! The demo's WGSL programs and their reflection tables
//!
//! Binding numbers and uniform layouts here must agree with the WGSL
//! sources in `shaders/`.

use std::sync::Arc;

use crate::error::RenderError;
use crate::gfx::rendering::device::RenderDevice;
use crate::gfx::resources::shader::{
    SamplerKind, ShaderDesc, ShaderProgram, TextureKind, UniformKind, UniformLayout,
};
use crate::gfx::scene::light::MAX_LIGHTS;

const ENTITY_VS: &str = include_str!("shaders/entity_vs.wgsl");
const ENTITY_PS: &str = include_str!("shaders/entity_ps.wgsl");
const SHADOW_VS: &str = include_str!("shaders/shadow_vs.wgsl");
const SKY_VS: &str = include_str!("shaders/sky_vs.wgsl");
const SKY_PS: &str = include_str!("shaders/sky_ps.wgsl");
const FULLSCREEN_VS: &str = include_str!("shaders/fullscreen_vs.wgsl");
const BLUR_PS: &str = include_str!("shaders/blur_ps.wgsl");

/// Size in bytes of one `Light` in the entity pixel shader
pub const LIGHT_STRIDE: u32 = 64;

pub fn entity_vertex_desc() -> ShaderDesc {
    ShaderDesc::vertex("entity_vs", ENTITY_VS, "vs_main").uniform_block(
        "per_object",
        0,
        UniformLayout::builder()
            .field("world", UniformKind::Matrix4)
            .field("view", UniformKind::Matrix4)
            .field("projection", UniformKind::Matrix4)
            .field("light_view", UniformKind::Matrix4)
            .field("light_projection", UniformKind::Matrix4)
            .field("world_inverse_transpose", UniformKind::Matrix4)
            .build(),
    )
}

pub fn entity_pixel_desc() -> ShaderDesc {
    ShaderDesc::pixel("entity_ps", ENTITY_PS, "fs_main")
        .uniform_block(
            "per_material",
            0,
            UniformLayout::builder()
                .field("color_tint", UniformKind::Float4)
                .field("roughness", UniformKind::Float)
                .build(),
        )
        .uniform_block(
            "per_frame",
            1,
            UniformLayout::builder()
                .field(
                    "lights",
                    UniformKind::Array {
                        stride: LIGHT_STRIDE,
                        count: MAX_LIGHTS as u32,
                    },
                )
                .field("ambient_color", UniformKind::Float3)
                .field("light_count", UniformKind::UInt)
                .field("camera_position", UniformKind::Float3)
                .build(),
        )
        .texture("albedo", 2, TextureKind::Color2d)
        .texture("normal_map", 3, TextureKind::Color2d)
        .texture("roughness_map", 4, TextureKind::Color2d)
        .texture("shadow_map", 5, TextureKind::Depth2d)
        .sampler("basic_sampler", 6, SamplerKind::Filtering)
        .sampler("shadow_sampler", 7, SamplerKind::Comparison)
}

pub fn shadow_vertex_desc() -> ShaderDesc {
    ShaderDesc::vertex("shadow_vs", SHADOW_VS, "vs_main").uniform_block(
        "per_object",
        0,
        UniformLayout::builder()
            .field("world", UniformKind::Matrix4)
            .field("view", UniformKind::Matrix4)
            .field("projection", UniformKind::Matrix4)
            .build(),
    )
}

pub fn sky_vertex_desc() -> ShaderDesc {
    ShaderDesc::vertex("sky_vs", SKY_VS, "vs_main").uniform_block(
        "per_frame",
        0,
        UniformLayout::builder()
            .field("view", UniformKind::Matrix4)
            .field("projection", UniformKind::Matrix4)
            .build(),
    )
}

pub fn sky_pixel_desc() -> ShaderDesc {
    ShaderDesc::pixel("sky_ps", SKY_PS, "fs_main")
        .texture("cube_map", 0, TextureKind::Cube)
        .sampler("basic_sampler", 1, SamplerKind::Filtering)
}

pub fn fullscreen_vertex_desc() -> ShaderDesc {
    ShaderDesc::vertex("fullscreen_vs", FULLSCREEN_VS, "vs_main").without_vertex_input()
}

pub fn blur_pixel_desc() -> ShaderDesc {
    ShaderDesc::pixel("blur_ps", BLUR_PS, "fs_main")
        .uniform_block(
            "blur",
            0,
            UniformLayout::builder()
                .field("blur_radius", UniformKind::Int)
                .field("pixel_width", UniformKind::Float)
                .field("pixel_height", UniformKind::Float)
                .build(),
        )
        .texture("pixels", 1, TextureKind::Color2d)
        .sampler("clamp_sampler", 2, SamplerKind::Filtering)
}

/// Every program the demo draws with, loaded once at startup
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    pub entity_vs: Arc<ShaderProgram>,
    pub entity_ps: Arc<ShaderProgram>,
    pub shadow_vs: Arc<ShaderProgram>,
    pub sky_vs: Arc<ShaderProgram>,
    pub sky_ps: Arc<ShaderProgram>,
    pub fullscreen_vs: Arc<ShaderProgram>,
    pub blur_ps: Arc<ShaderProgram>,
}

impl ShaderLibrary {
    pub fn load(device: &mut dyn RenderDevice) -> Result<Self, RenderError> {
        let library = Self {
            entity_vs: ShaderProgram::load(device, entity_vertex_desc())?,
            entity_ps: ShaderProgram::load(device, entity_pixel_desc())?,
            shadow_vs: ShaderProgram::load(device, shadow_vertex_desc())?,
            sky_vs: ShaderProgram::load(device, sky_vertex_desc())?,
            sky_ps: ShaderProgram::load(device, sky_pixel_desc())?,
            fullscreen_vs: ShaderProgram::load(device, fullscreen_vertex_desc())?,
            blur_ps: ShaderProgram::load(device, blur_pixel_desc())?,
        };
        log::info!("loaded 7 shader programs");
        Ok(library)
    }
}
