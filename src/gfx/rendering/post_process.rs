// src/gfx/rendering/post_process.rs
//! Full-screen blur over the off-screen color target

use std::sync::Arc;

use super::device::{
    AddressMode, FilterMode, RenderDevice, RenderTarget, SamplerDesc, SamplerHandle,
};
use super::frame::{ColorTarget, FrameRecorder};
use crate::error::RenderError;
use crate::gfx::resources::shader::ShaderProgram;

/// Largest blur radius the UI offers
pub const MAX_BLUR_RADIUS: u32 = 10;

#[derive(Debug)]
pub struct PostProcess {
    target: RenderTarget,
    sampler: SamplerHandle,
    blur_radius: u32,
    pixel_size: [f32; 2],
    vertex_shader: Arc<ShaderProgram>,
    pixel_shader: Arc<ShaderProgram>,
}

impl PostProcess {
    pub fn new(
        device: &mut dyn RenderDevice,
        width: u32,
        height: u32,
        blur_radius: u32,
        vertex_shader: Arc<ShaderProgram>,
        pixel_shader: Arc<ShaderProgram>,
    ) -> Result<Self, RenderError> {
        let target = device.create_render_target("post_process", width, height)?;
        let sampler = device.create_sampler(&SamplerDesc::new(
            "post_process",
            AddressMode::Clamp,
            FilterMode::Linear,
        ))?;
        Ok(Self {
            target,
            sampler,
            blur_radius: blur_radius.min(MAX_BLUR_RADIUS),
            pixel_size: pixel_size(width, height),
            vertex_shader,
            pixel_shader,
        })
    }

    /// Replaces the target with one of the new size and updates the pixel
    /// step. A zero-sized window leaves everything as it was.
    pub fn resize(
        &mut self,
        device: &mut dyn RenderDevice,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            log::debug!("ignoring {}x{} post-process resize", width, height);
            return Ok(());
        }
        let target = device.create_render_target("post_process", width, height)?;
        device.release_texture(self.target.shader_view);
        self.target = target;
        self.pixel_size = pixel_size(width, height);
        Ok(())
    }

    pub fn color_target(&self) -> ColorTarget {
        ColorTarget::Texture(self.target.target)
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn blur_radius(&self) -> u32 {
        self.blur_radius
    }

    pub fn set_blur_radius(&mut self, radius: u32) {
        self.blur_radius = radius.min(MAX_BLUR_RADIUS);
    }

    /// UV distance between neighbouring pixels: `(1 / width, 1 / height)`
    pub fn pixel_size(&self) -> [f32; 2] {
        self.pixel_size
    }

    /// Draws the blurred image into the back buffer with a single
    /// full-screen triangle
    pub fn render(&self, recorder: &mut FrameRecorder) {
        recorder.set_render_targets(Some(ColorTarget::BackBuffer), None);
        recorder.set_vertex_shader(&self.vertex_shader);
        recorder.set_pixel_shader(Some(&self.pixel_shader));

        let mut ps = self.pixel_shader.parameters();
        ps.set_int("blur_radius", self.blur_radius as i32);
        ps.set_float("pixel_width", self.pixel_size[0]);
        ps.set_float("pixel_height", self.pixel_size[1]);
        ps.set_shader_resource_view("pixels", self.target.shader_view);
        ps.set_sampler_state("clamp_sampler", self.sampler);
        ps.copy_all_buffer_data(recorder);

        recorder.draw(3);
    }
}

fn pixel_size(width: u32, height: u32) -> [f32; 2] {
    [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32]
}
