// src/gfx/rendering/shadow_map.rs
//! Directional-light shadow map
//!
//! Owns the depth texture, biased rasterizer state and comparison sampler,
//! plus the light's view and projection. The two kinds of change are kept
//! apart: a new resolution only swaps textures, a new light direction or
//! projection size only recomputes matrices.

use cgmath::{InnerSpace, Matrix4, Vector3};
use std::sync::Arc;

use super::device::{
    CompareFunction, CullMode, DepthTarget, DepthViewHandle, RasterizerDesc, RasterizerHandle,
    RenderDevice, SamplerDesc, SamplerHandle, TextureHandle,
};
use super::frame::{ColorTarget, FrameRecorder};
use crate::error::RenderError;
use crate::gfx::math::{look_to_lh, orthographic_lh};
use crate::gfx::resources::shader::ShaderProgram;
use crate::gfx::scene::entity::Entity;

/// Distance from the scene origin the light "camera" is placed at
const LIGHT_DISTANCE: f32 = 20.0;
const LIGHT_NEAR: f32 = 1.0;
const LIGHT_FAR: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowResolution {
    R512,
    R1024,
    R2048,
    R4096,
}

impl ShadowResolution {
    pub const ALL: [ShadowResolution; 4] = [
        ShadowResolution::R512,
        ShadowResolution::R1024,
        ShadowResolution::R2048,
        ShadowResolution::R4096,
    ];

    pub fn size(self) -> u32 {
        match self {
            ShadowResolution::R512 => 512,
            ShadowResolution::R1024 => 1024,
            ShadowResolution::R2048 => 2048,
            ShadowResolution::R4096 => 4096,
        }
    }

    pub fn from_size(size: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.size() == size)
    }

    pub fn label(self) -> &'static str {
        match self {
            ShadowResolution::R512 => "512",
            ShadowResolution::R1024 => "1024",
            ShadowResolution::R2048 => "2048",
            ShadowResolution::R4096 => "4096",
        }
    }
}

#[derive(Debug)]
pub struct ShadowMap {
    resolution: ShadowResolution,
    projection_size: f32,
    light_direction: Vector3<f32>,
    target: DepthTarget,
    rasterizer: RasterizerHandle,
    sampler: SamplerHandle,
    light_view: Matrix4<f32>,
    light_projection: Matrix4<f32>,
}

impl ShadowMap {
    pub fn new(
        device: &mut dyn RenderDevice,
        resolution: ShadowResolution,
        projection_size: f32,
        light_direction: Vector3<f32>,
    ) -> Result<Self, RenderError> {
        let target = Self::create_target(device, resolution)?;
        let rasterizer = device.create_rasterizer_state(&RasterizerDesc {
            cull_mode: CullMode::Back,
            depth_bias: 1000,
            slope_scaled_depth_bias: 1.0,
            depth_bias_clamp: 0.0,
        })?;
        let sampler = device.create_sampler(&SamplerDesc::comparison(
            "shadow_sampler",
            CompareFunction::LessEqual,
        ))?;

        let (light_view, light_projection) = light_matrices(light_direction, projection_size);
        log::info!(
            "shadow map {}x{}, projection size {}",
            resolution.size(),
            resolution.size(),
            projection_size
        );
        Ok(Self {
            resolution,
            projection_size,
            light_direction,
            target,
            rasterizer,
            sampler,
            light_view,
            light_projection,
        })
    }

    fn create_target(
        device: &mut dyn RenderDevice,
        resolution: ShadowResolution,
    ) -> Result<DepthTarget, RenderError> {
        let size = resolution.size();
        device.create_depth_target("shadow_map", size, size)
    }

    /// Recreates the depth texture at a new size. Matrices, sampler and
    /// rasterizer state are untouched. Returns whether anything changed.
    pub fn set_resolution(
        &mut self,
        device: &mut dyn RenderDevice,
        resolution: ShadowResolution,
    ) -> Result<bool, RenderError> {
        if resolution == self.resolution {
            return Ok(false);
        }
        let target = Self::create_target(device, resolution)?;
        device.release_texture(self.target.shader_view);
        self.target = target;
        self.resolution = resolution;
        log::info!("shadow map resized to {}", resolution.label());
        Ok(true)
    }

    /// Re-aims the light. Only the matrices change.
    pub fn set_light_direction(&mut self, direction: impl Into<Vector3<f32>>) {
        self.light_direction = direction.into();
        self.update_matrices();
    }

    /// Width and height in world units covered by the light's orthographic
    /// projection. Only the matrices change.
    pub fn set_projection_size(&mut self, size: f32) {
        self.projection_size = size.max(0.01);
        self.update_matrices();
    }

    fn update_matrices(&mut self) {
        let (view, projection) = light_matrices(self.light_direction, self.projection_size);
        self.light_view = view;
        self.light_projection = projection;
    }

    pub fn resolution(&self) -> ShadowResolution {
        self.resolution
    }

    pub fn projection_size(&self) -> f32 {
        self.projection_size
    }

    pub fn light_direction(&self) -> Vector3<f32> {
        self.light_direction
    }

    pub fn light_view(&self) -> Matrix4<f32> {
        self.light_view
    }

    pub fn light_projection(&self) -> Matrix4<f32> {
        self.light_projection
    }

    pub fn depth_view(&self) -> DepthViewHandle {
        self.target.depth_view
    }

    pub fn shader_view(&self) -> TextureHandle {
        self.target.shader_view
    }

    pub fn sampler(&self) -> SamplerHandle {
        self.sampler
    }

    pub fn rasterizer(&self) -> RasterizerHandle {
        self.rasterizer
    }

    /// Records the depth-only pass for every entity, then restores the
    /// default rasterizer, the window viewport, and `color` + `main_depth`
    /// as the render targets for the color pass
    pub fn render(
        &self,
        recorder: &mut FrameRecorder,
        shadow_vs: &Arc<ShaderProgram>,
        entities: &mut [Entity],
        window_size: (u32, u32),
        color: ColorTarget,
        main_depth: DepthViewHandle,
    ) {
        let size = self.resolution.size();
        recorder.clear_depth(self.target.depth_view, 1.0);
        recorder.set_render_targets(None, Some(self.target.depth_view));
        recorder.set_viewport(size, size);

        recorder.set_vertex_shader(shadow_vs);
        recorder.set_pixel_shader(None);
        recorder.set_rasterizer_state(Some(self.rasterizer));

        let mut params = shadow_vs.parameters();
        params.set_matrix4x4("view", self.light_view);
        params.set_matrix4x4("projection", self.light_projection);
        for entity in entities.iter_mut() {
            entity.draw_depth(recorder, &mut params);
        }

        recorder.set_rasterizer_state(None);
        recorder.set_viewport(window_size.0, window_size.1);
        recorder.set_render_targets(Some(color), Some(main_depth));
    }
}

/// View and projection of a directional light aimed at the origin
pub fn light_matrices(direction: Vector3<f32>, projection_size: f32) -> (Matrix4<f32>, Matrix4<f32>) {
    let direction = if direction.magnitude2() > f32::EPSILON {
        direction.normalize()
    } else {
        -Vector3::unit_y()
    };
    let eye = -direction * LIGHT_DISTANCE;
    // look_to needs an up vector that is not parallel to the view direction
    let up = if direction.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let view = look_to_lh(eye, direction, up);
    let projection = orthographic_lh(projection_size, projection_size, LIGHT_NEAR, LIGHT_FAR);
    (view, projection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_cube;
    use crate::gfx::rendering::frame::RenderCommand;
    use crate::gfx::rendering::headless::HeadlessDevice;
    use crate::gfx::rendering::shader_library::ShaderLibrary;
    use crate::gfx::scene::mesh::Mesh;
    use cgmath::Vector4;

    fn shadow_map(device: &mut HeadlessDevice) -> ShadowMap {
        ShadowMap::new(
            device,
            ShadowResolution::R2048,
            20.0,
            Vector3::new(0.5, -1.0, 0.5),
        )
        .unwrap()
    }

    #[test]
    fn test_resolution_change_swaps_textures_only() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut shadows = shadow_map(&mut device);
        let old_view = shadows.shader_view();
        let (view, projection) = (shadows.light_view(), shadows.light_projection());
        let (sampler, rasterizer) = (shadows.sampler(), shadows.rasterizer());

        assert!(shadows
            .set_resolution(&mut device, ShadowResolution::R4096)
            .unwrap());
        assert!(!device.is_live(old_view));
        assert_eq!(device.released_textures(), &[old_view]);
        let info = device.texture(shadows.shader_view()).unwrap();
        assert_eq!((info.width, info.height), (4096, 4096));
        assert_eq!(shadows.light_view(), view);
        assert_eq!(shadows.light_projection(), projection);
        assert_eq!(shadows.sampler(), sampler);
        assert_eq!(shadows.rasterizer(), rasterizer);

        // Same resolution again is a no-op
        assert!(!shadows
            .set_resolution(&mut device, ShadowResolution::R4096)
            .unwrap());
        assert_eq!(device.released_textures().len(), 1);
    }

    #[test]
    fn test_direction_change_recomputes_matrices_only() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut shadows = shadow_map(&mut device);
        let texture = shadows.shader_view();
        let projection = shadows.light_projection();
        let view = shadows.light_view();

        shadows.set_light_direction([-1.0, -0.25, 0.0]);
        assert_ne!(shadows.light_view(), view);
        assert_eq!(shadows.light_projection(), projection);
        assert_eq!(shadows.shader_view(), texture);

        shadows.set_projection_size(40.0);
        assert_ne!(shadows.light_projection(), projection);
        assert_eq!(shadows.shader_view(), texture);
        assert!(device.released_textures().is_empty());
    }

    #[test]
    fn test_straight_down_light_is_well_formed() {
        let (view, projection) = light_matrices(Vector3::new(0.0, -1.0, 0.0), 20.0);
        let origin = projection * view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(origin.x.abs() < 1e-5 && origin.y.abs() < 1e-5);
        assert!(origin.z > 0.0 && origin.z < 1.0);
        assert!(view.x.x.is_finite());
    }

    #[test]
    fn test_entity_at_origin_is_not_self_shadowed() {
        // Light straight down onto a unit cube at the origin
        let (view, projection) = light_matrices(Vector3::new(0.0, -1.0, 0.0), 20.0);
        let to_light_clip = |p: [f32; 3]| projection * view * Vector4::new(p[0], p[1], p[2], 1.0);

        // Nearest depth the pass would store at the texel over the cube center
        let data = generate_cube(1.0);
        let stored = data
            .positions
            .iter()
            .filter(|p| p[1] > 0.0)
            .map(|&p| to_light_clip(p).z)
            .fold(f32::MAX, f32::min);
        assert!(stored > 0.0 && stored < 1.0, "depth {}", stored);

        // The lit top face samples that texel and compares its own depth
        let surface = to_light_clip([0.0, 0.5, 0.0]);
        let uv = (surface.x * 0.5 + 0.5, -surface.y * 0.5 + 0.5);
        assert!((uv.0 - 0.5).abs() < 1e-4 && (uv.1 - 0.5).abs() < 1e-4);
        let bias = 1e-4;
        assert!(surface.z <= stored + bias);

        // The bottom face is behind the stored depth and would be shadowed
        let underside = to_light_clip([0.0, -0.5, 0.0]);
        assert!(underside.z > stored + bias);
    }

    #[test]
    fn test_render_sequence() {
        let mut device = HeadlessDevice::new(800, 600);
        let shaders = ShaderLibrary::load(&mut device).unwrap();
        let shadows = shadow_map(&mut device);
        let mesh = Arc::new(Mesh::new(&mut device, "cube", &generate_cube(1.0)).unwrap());
        let mut entities = vec![
            Entity::new("a", Arc::clone(&mesh), "m"),
            Entity::new("b", mesh, "m"),
        ];
        let post = device.create_render_target("post", 800, 600).unwrap();

        let mut recorder = FrameRecorder::new();
        shadows.render(
            &mut recorder,
            &shaders.shadow_vs,
            &mut entities,
            (800, 600),
            ColorTarget::Texture(post.target),
            device.main_depth(),
        );
        let frame = recorder.finish();
        let c = frame.commands();

        assert_eq!(
            c[0],
            RenderCommand::ClearDepth {
                target: shadows.depth_view(),
                depth: 1.0
            }
        );
        assert_eq!(
            c[1],
            RenderCommand::SetRenderTargets {
                color: None,
                depth: Some(shadows.depth_view())
            }
        );
        assert_eq!(c[2], RenderCommand::SetViewport { width: 2048, height: 2048 });
        assert_eq!(c[4], RenderCommand::SetPixelShader(None));
        assert_eq!(c[5], RenderCommand::SetRasterizerState(Some(shadows.rasterizer())));
        let draws = c
            .iter()
            .filter(|cmd| matches!(cmd, RenderCommand::DrawIndexed { .. }))
            .count();
        assert_eq!(draws, 2);

        let n = c.len();
        assert_eq!(c[n - 3], RenderCommand::SetRasterizerState(None));
        assert_eq!(c[n - 2], RenderCommand::SetViewport { width: 800, height: 600 });
        assert_eq!(
            c[n - 1],
            RenderCommand::SetRenderTargets {
                color: Some(ColorTarget::Texture(post.target)),
                depth: Some(device.main_depth())
            }
        );
        device.submit(frame).unwrap();
    }
}
