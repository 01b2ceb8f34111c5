// src/gfx/scene/mesh.rs
//! GPU-resident geometry

use std::path::Path;

use crate::error::RenderError;
use crate::gfx::geometry::MeshData;
use crate::gfx::rendering::device::{BufferHandle, RenderDevice};
use crate::gfx::rendering::frame::FrameRecorder;
use crate::gfx::scene::vertex::Vertex;

/// Immutable vertex and index buffers for one piece of geometry
///
/// No CPU copy is kept once the buffers exist. Entities share meshes
/// through `Arc<Mesh>`.
#[derive(Debug, PartialEq, Eq)]
pub struct Mesh {
    label: String,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
}

impl Mesh {
    /// Uploads explicit vertex and index arrays
    pub fn from_buffers(
        device: &mut dyn RenderDevice,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<Self, RenderError> {
        let vertex_buffer = device.create_vertex_buffer(label, vertices)?;
        let index_buffer = device.create_index_buffer(label, indices)?;
        log::debug!(
            "mesh '{}': {} vertices, {} indices",
            label,
            vertices.len(),
            indices.len()
        );
        Ok(Self {
            label: label.to_string(),
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        })
    }

    /// Computes tangents for the data, then uploads it
    pub fn new(device: &mut dyn RenderDevice, label: &str, data: &MeshData) -> Result<Self, RenderError> {
        let vertices = data.to_vertices();
        Self::from_buffers(device, label, &vertices, &data.indices)
    }

    /// Loads an OBJ file and uploads it
    pub fn from_obj(device: &mut dyn RenderDevice, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = MeshData::load_obj(path)?;
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mesh".to_string());
        Ok(Self::new(device, &label, &data)?)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Binds both buffers and issues one indexed draw
    pub fn draw(&self, recorder: &mut FrameRecorder) {
        recorder.draw_mesh(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_cube;
    use crate::gfx::rendering::frame::RenderCommand;
    use crate::gfx::rendering::headless::HeadlessDevice;

    #[test]
    fn test_mesh_upload_and_draw() {
        let mut device = HeadlessDevice::new(64, 64);
        let data = generate_cube(1.0);
        let mesh = Mesh::new(&mut device, "cube", &data).unwrap();
        assert_eq!(mesh.index_count() as usize, data.indices.len());
        assert_eq!(
            device.buffer(mesh.vertex_buffer()).unwrap().size,
            (data.vertex_count() * std::mem::size_of::<Vertex>()) as u64
        );

        let mut recorder = FrameRecorder::new();
        mesh.draw(&mut recorder);
        assert_eq!(
            recorder.finish().commands(),
            &[RenderCommand::DrawIndexed {
                vertex_buffer: mesh.vertex_buffer(),
                index_buffer: mesh.index_buffer(),
                index_count: 36,
            }]
        );
    }

    #[test]
    fn test_missing_obj_is_an_error() {
        let mut device = HeadlessDevice::new(64, 64);
        assert!(Mesh::from_obj(&mut device, "/no/such/mesh.obj").is_err());
    }
}
