//! # Scene Module
//!
//! The objects a frame draws.
//!
//! - [`Mesh`] - immutable vertex and index buffers, shared by entities
//! - [`Entity`] - a mesh and a material with its own transform
//! - [`Light`] - directional, point and spot lights packed for the pixel shader
//! - [`Sky`] - the cubemap drawn behind everything
//! - [`Vertex`] - position, normal, UV and tangent
//!
//! Entities never own their mesh or material: meshes are `Arc`-shared and
//! materials are looked up by ID in a
//! [`MaterialLibrary`](crate::gfx::resources::material::MaterialLibrary).

pub mod entity;
pub mod light;
pub mod mesh;
pub mod sky;
pub mod vertex;

// Re-export main types
pub use entity::Entity;
pub use light::{Light, LightKind};
pub use mesh::Mesh;
pub use sky::Sky;
pub use vertex::Vertex;
