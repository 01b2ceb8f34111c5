// src/gfx/rendering/pipeline_cache.rs
//! Compiled shader modules and lazily built render pipelines
//!
//! A D3D-style context sets shaders, states and targets independently; wgpu
//! bakes them into one immutable pipeline. Every distinct combination met
//! during replay is built once and cached under a [`PipelineKey`].

use std::collections::HashMap;

use wgpu::*;

use super::device::{
    CompareFunction as DeviceCompare, CullMode, DepthStencilDesc, DepthStencilHandle,
    RasterizerDesc, RasterizerHandle, ShaderHandle,
};
use crate::error::RenderError;
use crate::gfx::resources::shader::{ShaderDesc, ShaderStage, VertexInput};
use crate::gfx::scene::vertex::Vertex;
use crate::wgpu_utils::{sampler_of_kind, texture_of_kind, uniform};

/// Everything that selects a distinct pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub vertex_shader: ShaderHandle,
    pub pixel_shader: Option<ShaderHandle>,
    pub color_format: Option<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub rasterizer: Option<RasterizerHandle>,
    pub depth_stencil: Option<DepthStencilHandle>,
}

/// A shader module with the bind group layout its reflection describes
pub struct CompiledShader {
    pub module: ShaderModule,
    pub layout: BindGroupLayout,
    pub desc: ShaderDesc,
}

pub struct PipelineCache {
    shaders: HashMap<u32, CompiledShader>,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self {
            shaders: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    /// Compiles `desc` and builds its bind group layout
    pub fn load_shader(
        &mut self,
        device: &Device,
        handle: ShaderHandle,
        desc: &ShaderDesc,
    ) -> Result<(), RenderError> {
        device.push_error_scope(ErrorFilter::Validation);
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(desc.label),
            source: ShaderSource::Wgsl(desc.source.into()),
        });
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(&format!("{} bindings", desc.label)),
            entries: &layout_entries(desc),
        });
        check_error_scope(device, desc.label)?;

        self.shaders.insert(
            handle.0,
            CompiledShader {
                module,
                layout,
                desc: desc.clone(),
            },
        );
        Ok(())
    }

    pub fn shader(&self, handle: ShaderHandle) -> Option<&CompiledShader> {
        self.shaders.get(&handle.0)
    }

    pub fn pipeline(&self, key: &PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Builds the pipeline for `key` unless it is already cached
    pub fn prepare(
        &mut self,
        device: &Device,
        key: PipelineKey,
        rasterizer: &RasterizerDesc,
        depth_stencil: &DepthStencilDesc,
    ) -> Result<(), RenderError> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let pipeline = self.create_pipeline(device, &key, rasterizer, depth_stencil)?;
        log::debug!("created pipeline #{} for {:?}", self.pipelines.len() + 1, key);
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    fn create_pipeline(
        &self,
        device: &Device,
        key: &PipelineKey,
        rasterizer: &RasterizerDesc,
        depth_stencil: &DepthStencilDesc,
    ) -> Result<RenderPipeline, RenderError> {
        let vertex = self
            .shaders
            .get(&key.vertex_shader.0)
            .ok_or(RenderError::UnknownHandle {
                kind: "shader",
                id: key.vertex_shader.0,
            })?;
        let pixel = match key.pixel_shader {
            Some(handle) => Some(self.shaders.get(&handle.0).ok_or(RenderError::UnknownHandle {
                kind: "shader",
                id: handle.0,
            })?),
            None => None,
        };

        let mut bind_group_layouts = vec![&vertex.layout];
        if let Some(pixel) = pixel {
            bind_group_layouts.push(&pixel.layout);
        }
        let label = match pixel {
            Some(pixel) => format!("{}+{}", vertex.desc.label, pixel.desc.label),
            None => vertex.desc.label.to_string(),
        };

        device.push_error_scope(ErrorFilter::Validation);
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let vertex_buffers = match vertex.desc.vertex_input {
            VertexInput::Mesh => vec![Vertex::desc()],
            VertexInput::None => Vec::new(),
        };
        let color_targets: Vec<Option<ColorTargetState>> = key
            .color_format
            .map(|format| ColorTargetState {
                format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })
            .into_iter()
            .map(Some)
            .collect();

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&layout),
            vertex: VertexState {
                module: &vertex.module,
                entry_point: Some(vertex.desc.entry_point),
                buffers: &vertex_buffers,
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: pixel.map(|pixel| FragmentState {
                module: &pixel.module,
                entry_point: Some(pixel.desc.entry_point),
                targets: &color_targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: primitive_state(rasterizer),
            depth_stencil: key
                .depth_format
                .map(|format| depth_stencil_state(format, depth_stencil, rasterizer)),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        check_error_scope(device, &label)?;
        Ok(pipeline)
    }
}

impl Default for PipelineCache {
    fn default() -> Self {
        Self::new()
    }
}

fn check_error_scope(device: &Device, label: &str) -> Result<(), RenderError> {
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(RenderError::Validation {
            label: label.to_string(),
            message: error.to_string(),
        }),
        None => Ok(()),
    }
}

/// Bind group layout entries for one shader stage's reflection
pub fn layout_entries(desc: &ShaderDesc) -> Vec<BindGroupLayoutEntry> {
    let visibility = match desc.stage {
        ShaderStage::Vertex => ShaderStages::VERTEX,
        ShaderStage::Pixel => ShaderStages::FRAGMENT,
    };
    let entry = |binding: u32, ty: BindingType| BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    };

    let mut entries: Vec<BindGroupLayoutEntry> = desc
        .uniform_blocks
        .iter()
        .map(|block| entry(block.binding, uniform(block.layout.size() as u64)))
        .chain(
            desc.textures
                .iter()
                .map(|slot| entry(slot.binding, texture_of_kind(slot.kind))),
        )
        .chain(
            desc.samplers
                .iter()
                .map(|slot| entry(slot.binding, sampler_of_kind(slot.kind))),
        )
        .collect();
    entries.sort_by_key(|e| e.binding);
    entries
}

pub fn compare_function(compare: DeviceCompare) -> CompareFunction {
    match compare {
        DeviceCompare::Less => CompareFunction::Less,
        DeviceCompare::LessEqual => CompareFunction::LessEqual,
        DeviceCompare::Always => CompareFunction::Always,
    }
}

/// Clockwise triangles face the camera
pub fn primitive_state(rasterizer: &RasterizerDesc) -> PrimitiveState {
    PrimitiveState {
        topology: PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: FrontFace::Cw,
        cull_mode: match rasterizer.cull_mode {
            CullMode::None => None,
            CullMode::Front => Some(Face::Front),
            CullMode::Back => Some(Face::Back),
        },
        polygon_mode: PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

pub fn depth_stencil_state(
    format: TextureFormat,
    depth_stencil: &DepthStencilDesc,
    rasterizer: &RasterizerDesc,
) -> DepthStencilState {
    DepthStencilState {
        format,
        depth_write_enabled: depth_stencil.depth_write,
        depth_compare: compare_function(depth_stencil.depth_compare),
        stencil: StencilState::default(),
        bias: DepthBiasState {
            constant: rasterizer.depth_bias,
            slope_scale: rasterizer.slope_scaled_depth_bias,
            clamp: rasterizer.depth_bias_clamp,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::shader_library::{
        blur_pixel_desc, entity_pixel_desc, fullscreen_vertex_desc, shadow_vertex_desc,
    };

    #[test]
    fn test_entity_pixel_layout() {
        let entries = layout_entries(&entity_pixel_desc());
        let bindings: Vec<u32> = entries.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(entries.iter().all(|e| e.visibility == ShaderStages::FRAGMENT));
        assert!(matches!(
            entries[5].ty,
            BindingType::Texture {
                sample_type: TextureSampleType::Depth,
                ..
            }
        ));
        assert!(matches!(
            entries[7].ty,
            BindingType::Sampler(SamplerBindingType::Comparison)
        ));
        match entries[0].ty {
            BindingType::Buffer {
                min_binding_size, ..
            } => assert_eq!(min_binding_size.map(|s| s.get()), Some(32)),
            _ => panic!("per-material block should be a uniform buffer"),
        }
    }

    #[test]
    fn test_vertex_layouts() {
        let shadow = layout_entries(&shadow_vertex_desc());
        assert_eq!(shadow.len(), 1);
        assert_eq!(shadow[0].visibility, ShaderStages::VERTEX);
        assert!(layout_entries(&fullscreen_vertex_desc()).is_empty());
        assert_eq!(layout_entries(&blur_pixel_desc()).len(), 3);
    }

    #[test]
    fn test_rasterizer_maps_to_primitive_and_bias() {
        let shadow = RasterizerDesc {
            cull_mode: CullMode::None,
            depth_bias: 1000,
            slope_scaled_depth_bias: 1.0,
            depth_bias_clamp: 0.0,
        };
        let primitive = primitive_state(&shadow);
        assert_eq!(primitive.cull_mode, None);
        assert_eq!(primitive.front_face, FrontFace::Cw);

        let depth = depth_stencil_state(
            TextureFormat::Depth32Float,
            &DepthStencilDesc {
                depth_compare: DeviceCompare::LessEqual,
                depth_write: false,
            },
            &shadow,
        );
        assert_eq!(depth.bias.constant, 1000);
        assert_eq!(depth.bias.slope_scale, 1.0);
        assert_eq!(depth.depth_compare, CompareFunction::LessEqual);
        assert!(!depth.depth_write_enabled);

        assert_eq!(
            primitive_state(&RasterizerDesc::default()).cull_mode,
            Some(Face::Back)
        );
    }
}
