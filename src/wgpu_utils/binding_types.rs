// src/wgpu_utils/binding_types.rs
//! WGPU binding type utilities

use crate::gfx::resources::shader::{SamplerKind, TextureKind};

pub fn uniform(min_binding_size: u64) -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: wgpu::BufferSize::new(min_binding_size),
    }
}

pub fn sampler(filtering: wgpu::SamplerBindingType) -> wgpu::BindingType {
    wgpu::BindingType::Sampler(filtering)
}

pub fn texture_2d() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

pub fn depth_texture_2d() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Depth,
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

pub fn texture_cube() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::Cube,
        multisampled: false,
    }
}

pub fn texture_of_kind(kind: TextureKind) -> wgpu::BindingType {
    match kind {
        TextureKind::Color2d => texture_2d(),
        TextureKind::Depth2d => depth_texture_2d(),
        TextureKind::Cube => texture_cube(),
    }
}

pub fn sampler_of_kind(kind: SamplerKind) -> wgpu::BindingType {
    match kind {
        SamplerKind::Filtering => sampler(wgpu::SamplerBindingType::Filtering),
        SamplerKind::Comparison => sampler(wgpu::SamplerBindingType::Comparison),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_texture_is_not_filterable_float() {
        assert!(matches!(
            texture_of_kind(TextureKind::Depth2d),
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                ..
            }
        ));
        assert!(matches!(
            sampler_of_kind(SamplerKind::Comparison),
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
        ));
    }

    #[test]
    fn test_zero_min_binding_size_is_unbounded() {
        assert!(matches!(
            uniform(0),
            wgpu::BindingType::Buffer {
                min_binding_size: None,
                ..
            }
        ));
    }
}
