//! Texture resource management for wgpu
//!
//! Creates the GPU side of every texture the device hands out: sampled 2D
//! maps, cubemaps, depth buffers and off-screen color targets.

use crate::gfx::resources::shader::TextureKind;
use crate::gfx::resources::texture_data::{CubemapData, TextureData};

/// GPU texture with the views the renderer needs
///
/// `view` is what shaders sample. `attachment` is set for depth buffers and
/// render targets and is what render passes write to.
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub attachment: Option<wgpu::TextureView>,
    pub kind: TextureKind,
}

impl TextureResource {
    /// Depth format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of off-screen color targets
    pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    /// Depth buffer that shaders can also read (shadow maps, main depth)
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });
        let attachment = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            attachment: Some(attachment),
            kind: TextureKind::Depth2d,
        }
    }

    pub fn create_render_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let attachment = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            attachment: Some(attachment),
            kind: TextureKind::Color2d,
        }
    }

    /// Uploads RGBA8 pixels into a sampled 2D texture
    pub fn create_from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &TextureData,
        label: &str,
    ) -> Self {
        let format = if data.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, 0, data.width, data.height, &data.pixels);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            attachment: None,
            kind: TextureKind::Color2d,
        }
    }

    /// Six square faces in +X, -X, +Y, -Y, +Z, -Z order
    pub fn create_cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &CubemapData,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: data.size,
                height: data.size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in data.faces.iter().enumerate() {
            write_layer(queue, &texture, layer as u32, data.size, data.size, face);
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            texture,
            view,
            attachment: None,
            kind: TextureKind::Cube,
        }
    }

    /// 1x1 stand-in bound when a shader slot has nothing assigned
    pub fn create_fallback(device: &wgpu::Device, queue: &wgpu::Queue, kind: TextureKind) -> Self {
        match kind {
            TextureKind::Color2d => {
                Self::create_from_data(device, queue, &TextureData::solid([255; 4], false), "fallback_2d")
            }
            TextureKind::Depth2d => Self::create_depth_texture(device, 1, 1, "fallback_depth"),
            TextureKind::Cube => {
                let face = vec![255u8; 4];
                let data = CubemapData {
                    size: 1,
                    faces: std::array::from_fn(|_| face.clone()),
                };
                Self::create_cubemap(device, queue, &data, "fallback_cube")
            }
        }
    }
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, layer: u32, width: u32, height: u32, pixels: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
