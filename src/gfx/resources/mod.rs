// src/gfx/resources/mod.rs
//! GPU-facing resources
//!
//! Shader programs with named parameters, materials, CPU texture data and
//! the wgpu textures created from it.

pub mod material;
pub mod shader;
pub mod texture_data;
pub mod texture_resource;

// Re-export main types
pub use material::{Material, MaterialId, MaterialLibrary};
pub use shader::{ShaderParameters, ShaderProgram};
pub use texture_data::{CubemapData, TextureData};
pub use texture_resource::TextureResource;
