// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! The [`device::RenderDevice`] trait allocates resources; frames are
//! recorded with [`frame::FrameRecorder`] and replayed by a backend.
//! [`wgpu_device::WgpuDevice`] drives the GPU, [`headless::HeadlessDevice`]
//! stands in for it in tests.

pub mod device;
pub mod frame;
pub mod headless;
pub mod pipeline_cache;
pub mod post_process;
pub mod replay;
pub mod shader_library;
pub mod shadow_map;
pub mod wgpu_device;

// Re-export main types
pub use device::RenderDevice;
pub use frame::{ColorTarget, FrameCommands, FrameRecorder, RenderCommand};
pub use headless::HeadlessDevice;
pub use post_process::PostProcess;
pub use shader_library::ShaderLibrary;
pub use shadow_map::{ShadowMap, ShadowResolution};
pub use wgpu_device::WgpuDevice;
