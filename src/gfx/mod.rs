//! # Graphics Module
//!
//! Everything between the game loop and the GPU.
//!
//! - **Math and transforms** ([`math`], [`transform`]) - left-handed matrix
//!   helpers and the cached scale/rotate/translate transform
//! - **Camera** ([`camera`]) - fly camera with keyboard and mouse-look input
//! - **Geometry** ([`geometry`]) - procedural shapes and OBJ loading
//! - **Scene** ([`scene`]) - meshes, entities, lights and the sky
//! - **Resources** ([`resources`]) - shader programs, materials and texture data
//! - **Rendering** ([`rendering`]) - the device interface, frame recording,
//!   the shadow and post-process passes and the wgpu backend
//!
//! Scene code only talks to [`rendering::device::RenderDevice`] and records
//! into a [`rendering::frame::FrameRecorder`]; wgpu is confined to the
//! backend.

pub mod camera;
pub mod geometry;
pub mod math;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod transform;

pub use camera::{Camera, CameraSettings};
pub use transform::Transform;
