// src/gfx/rendering/device.rs
//! Device capability interface
//!
//! Everything that allocates GPU resources goes through [`RenderDevice`].
//! Resources come back as small copyable handles; drawing never touches the
//! device directly but is recorded into a
//! [`FrameRecorder`](super::frame::FrameRecorder) and replayed by the
//! backend. This keeps scene setup and frame sequencing testable with the
//! [`HeadlessDevice`](super::headless::HeadlessDevice).

use crate::error::RenderError;
use crate::gfx::resources::shader::ShaderDesc;
use crate::gfx::resources::texture_data::{CubemapData, TextureData};
use crate::gfx::scene::vertex::Vertex;

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn id(self) -> u32 {
                self.0
            }
        }
    };
}

resource_handle!(
    /// Immutable vertex or index buffer
    BufferHandle
);
resource_handle!(
    /// Shader-readable view of a texture (2D, depth or cube)
    TextureHandle
);
resource_handle!(
    /// Color render target view
    RenderTargetHandle
);
resource_handle!(
    /// Depth-stencil view
    DepthViewHandle
);
resource_handle!(SamplerHandle);
resource_handle!(RasterizerHandle);
resource_handle!(DepthStencilHandle);
resource_handle!(ShaderHandle);

/// A depth texture usable both as a depth attachment and as a shader input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthTarget {
    pub depth_view: DepthViewHandle,
    pub shader_view: TextureHandle,
    pub width: u32,
    pub height: u32,
}

/// An off-screen color texture usable as a render target and a shader input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub target: RenderTargetHandle,
    pub shader_view: TextureHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Wrap,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Point,
    Linear,
    /// Linear filtering with anisotropic sampling (1..=16)
    Anisotropic(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Less,
    LessEqual,
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub label: String,
    pub address_mode: AddressMode,
    pub filter: FilterMode,
    /// Set for shadow-map comparison samplers
    pub compare: Option<CompareFunction>,
}

impl SamplerDesc {
    pub fn new(label: impl Into<String>, address_mode: AddressMode, filter: FilterMode) -> Self {
        Self {
            label: label.into(),
            address_mode,
            filter,
            compare: None,
        }
    }

    pub fn comparison(label: impl Into<String>, compare: CompareFunction) -> Self {
        Self {
            label: label.into(),
            address_mode: AddressMode::Clamp,
            filter: FilterMode::Linear,
            compare: Some(compare),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerDesc {
    pub cull_mode: CullMode,
    /// Constant depth bias in depth-buffer units
    pub depth_bias: i32,
    pub slope_scaled_depth_bias: f32,
    pub depth_bias_clamp: f32,
}

impl Default for RasterizerDesc {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            depth_bias: 0,
            slope_scaled_depth_bias: 0.0,
            depth_bias_clamp: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_compare: CompareFunction,
    pub depth_write: bool,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_compare: CompareFunction::Less,
            depth_write: true,
        }
    }
}

/// Resource creation and queries shared by every backend
///
/// Creation errors are returned, never swallowed: callers treat them as
/// fatal.
pub trait RenderDevice {
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        vertices: &[Vertex],
    ) -> Result<BufferHandle, RenderError>;

    fn create_index_buffer(
        &mut self,
        label: &str,
        indices: &[u32],
    ) -> Result<BufferHandle, RenderError>;

    fn create_texture_2d(
        &mut self,
        label: &str,
        data: &TextureData,
    ) -> Result<TextureHandle, RenderError>;

    fn create_cubemap(
        &mut self,
        label: &str,
        data: &CubemapData,
    ) -> Result<TextureHandle, RenderError>;

    fn create_depth_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<DepthTarget, RenderError>;

    fn create_render_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, RenderError>;

    /// Frees a texture and every view of it. Unknown handles are ignored.
    fn release_texture(&mut self, texture: TextureHandle);

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, RenderError>;

    fn create_rasterizer_state(
        &mut self,
        desc: &RasterizerDesc,
    ) -> Result<RasterizerHandle, RenderError>;

    fn create_depth_stencil_state(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<DepthStencilHandle, RenderError>;

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<ShaderHandle, RenderError>;

    /// Current swap-chain size in pixels
    fn back_buffer_size(&self) -> (u32, u32);

    /// The window-sized depth buffer used by the main color pass
    fn main_depth(&self) -> DepthViewHandle;
}

/// Shared size validation for texture-creating backends
pub(crate) fn check_texture_size(
    label: &str,
    width: u32,
    height: u32,
    max: u32,
) -> Result<(), RenderError> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(RenderError::InvalidTextureSize {
            label: label.to_string(),
            width,
            height,
            max,
        });
    }
    Ok(())
}
