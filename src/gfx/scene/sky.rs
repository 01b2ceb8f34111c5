// src/gfx/scene/sky.rs
//! Cubemap sky box

use std::path::Path;
use std::sync::Arc;

use crate::error::RenderError;
use crate::gfx::camera::Camera;
use crate::gfx::geometry::generate_sky_cube;
use crate::gfx::rendering::device::{
    CompareFunction, CullMode, DepthStencilDesc, DepthStencilHandle, RasterizerDesc,
    RasterizerHandle, RenderDevice, SamplerHandle, TextureHandle,
};
use crate::gfx::rendering::frame::FrameRecorder;
use crate::gfx::resources::shader::ShaderProgram;
use crate::gfx::resources::texture_data::CubemapData;
use crate::gfx::scene::mesh::Mesh;

/// Zenith, horizon and ground colors of the generated sky
const ZENITH: [f32; 3] = [0.15, 0.35, 0.75];
const HORIZON: [f32; 3] = [0.75, 0.85, 0.95];
const GROUND: [f32; 3] = [0.25, 0.22, 0.2];

/// Draws the inside of a cube sampled from a cubemap
///
/// Drawn after opaque geometry. Depth is pinned to the far plane and tested
/// with `LessEqual` so only pixels nothing else covered receive sky.
#[derive(Debug)]
pub struct Sky {
    mesh: Arc<Mesh>,
    sampler: SamplerHandle,
    cubemap: TextureHandle,
    depth_stencil: DepthStencilHandle,
    rasterizer: RasterizerHandle,
    vertex_shader: Arc<ShaderProgram>,
    pixel_shader: Arc<ShaderProgram>,
}

impl Sky {
    pub fn new(
        device: &mut dyn RenderDevice,
        mesh: Arc<Mesh>,
        sampler: SamplerHandle,
        faces: &CubemapData,
        vertex_shader: Arc<ShaderProgram>,
        pixel_shader: Arc<ShaderProgram>,
    ) -> Result<Self, RenderError> {
        let cubemap = device.create_cubemap("sky", faces)?;
        let depth_stencil = device.create_depth_stencil_state(&DepthStencilDesc {
            depth_compare: CompareFunction::LessEqual,
            depth_write: true,
        })?;
        let rasterizer = device.create_rasterizer_state(&RasterizerDesc {
            cull_mode: CullMode::Front,
            ..Default::default()
        })?;
        log::debug!("sky cubemap {}px per face", faces.size);
        Ok(Self {
            mesh,
            sampler,
            cubemap,
            depth_stencil,
            rasterizer,
            vertex_shader,
            pixel_shader,
        })
    }

    /// Sky from `right`, `left`, `up`, `down`, `front` and `back` PNGs in
    /// `dir`, or a generated gradient when no directory is given
    pub fn load_faces(dir: Option<&Path>) -> anyhow::Result<CubemapData> {
        match dir {
            Some(dir) => Ok(CubemapData::from_dir(dir)?),
            None => Ok(CubemapData::gradient(128, ZENITH, HORIZON, GROUND)),
        }
    }

    /// Builds the sky cube mesh used by [`Sky::new`]
    pub fn cube_mesh(device: &mut dyn RenderDevice) -> Result<Mesh, RenderError> {
        Mesh::new(device, "sky_cube", &generate_sky_cube())
    }

    pub fn cubemap(&self) -> TextureHandle {
        self.cubemap
    }

    pub fn draw(&self, recorder: &mut FrameRecorder, camera: &Camera) {
        recorder.set_rasterizer_state(Some(self.rasterizer));
        recorder.set_depth_stencil_state(Some(self.depth_stencil));

        recorder.set_vertex_shader(&self.vertex_shader);
        recorder.set_pixel_shader(Some(&self.pixel_shader));

        let mut vs = self.vertex_shader.parameters();
        vs.set_matrix4x4("view", camera.view_matrix());
        vs.set_matrix4x4("projection", camera.projection_matrix());
        vs.copy_all_buffer_data(recorder);

        let mut ps = self.pixel_shader.parameters();
        ps.set_shader_resource_view("cube_map", self.cubemap);
        ps.set_sampler_state("basic_sampler", self.sampler);
        ps.copy_all_buffer_data(recorder);

        self.mesh.draw(recorder);

        recorder.set_rasterizer_state(None);
        recorder.set_depth_stencil_state(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::CameraSettings;
    use crate::gfx::rendering::device::{AddressMode, FilterMode, SamplerDesc};
    use crate::gfx::rendering::frame::RenderCommand;
    use crate::gfx::rendering::headless::{HeadlessDevice, TextureUsage};
    use crate::gfx::rendering::shader_library::ShaderLibrary;

    #[test]
    fn test_sky_states_and_restore() {
        let mut device = HeadlessDevice::new(64, 64);
        let shaders = ShaderLibrary::load(&mut device).unwrap();
        let sampler = device
            .create_sampler(&SamplerDesc::new("sky", AddressMode::Clamp, FilterMode::Linear))
            .unwrap();
        let mesh = Arc::new(Sky::cube_mesh(&mut device).unwrap());
        let faces = Sky::load_faces(None).unwrap();
        let sky = Sky::new(
            &mut device,
            mesh,
            sampler,
            &faces,
            Arc::clone(&shaders.sky_vs),
            Arc::clone(&shaders.sky_ps),
        )
        .unwrap();

        assert_eq!(
            device.texture(sky.cubemap()).map(|t| t.usage),
            Some(TextureUsage::Cube)
        );
        assert_eq!(
            device.rasterizer(sky.rasterizer).map(|r| r.cull_mode),
            Some(CullMode::Front)
        );
        assert_eq!(
            device.depth_stencil(sky.depth_stencil).map(|d| d.depth_compare),
            Some(CompareFunction::LessEqual)
        );

        let camera = Camera::new([0.0, 0.0, -3.0], [0.0; 3], 1.0, CameraSettings::default());
        let mut recorder = FrameRecorder::new();
        sky.draw(&mut recorder, &camera);
        let frame = recorder.finish();
        let c = frame.commands();
        assert_eq!(c[0], RenderCommand::SetRasterizerState(Some(sky.rasterizer)));
        assert_eq!(c[c.len() - 2], RenderCommand::SetRasterizerState(None));
        assert_eq!(c[c.len() - 1], RenderCommand::SetDepthStencilState(None));
        device.submit(frame).unwrap();
    }
}
