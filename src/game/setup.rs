// src/game/setup.rs
//! One-shot scene construction
//!
//! Each phase takes only what it needs, so any of them can be exercised on
//! a [`HeadlessDevice`](crate::gfx::rendering::headless::HeadlessDevice).

use anyhow::Context;
use cgmath::Vector3;
use std::path::Path;
use std::sync::Arc;

use crate::gfx::camera::{Camera, CameraSettings};
use crate::gfx::geometry::{
    generate_cube, generate_cylinder, generate_helix, generate_plane, generate_sphere,
    generate_torus, MeshData,
};
use crate::gfx::rendering::device::{AddressMode, FilterMode, RenderDevice, SamplerDesc, SamplerHandle};
use crate::gfx::rendering::shader_library::ShaderLibrary;
use crate::gfx::resources::material::{Material, MaterialId, MaterialLibrary};
use crate::gfx::resources::texture_data::TextureData;
use crate::gfx::scene::entity::Entity;
use crate::gfx::scene::light::Light;
use crate::gfx::scene::mesh::Mesh;

/// Demo materials: (name, tint, roughness, checker color)
const MATERIALS: [(&str, [f32; 4], f32, [u8; 4]); 3] = [
    ("yellow", [1.0, 1.0, 0.3, 1.0], 0.2, [230, 200, 120, 255]),
    ("magenta", [1.0, 0.3, 1.0, 1.0], 0.5, [200, 200, 200, 255]),
    ("cyan", [0.3, 1.0, 1.0, 1.0], 0.8, [180, 210, 230, 255]),
];

/// Which material each demo entity uses, by index into [`MATERIALS`]
const ENTITY_MATERIALS: [usize; 5] = [0, 1, 2, 1, 2];

/// Resting positions; animation oscillates around these
pub const ENTITY_POSITIONS: [[f32; 3]; 5] = [
    [2.0, 0.0, 0.0],
    [-2.0, 0.0, 0.0],
    [0.0, 0.0, 0.0],
    [0.0, 2.0, 0.0],
    [0.0, -2.0, 0.0],
];

/// Height of the shadow-receiving floor
pub const FLOOR_HEIGHT: f32 = -5.0;

/// Samplers shared by materials and the sky
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Samplers {
    /// Wrapping, anisotropic; used for every material map
    pub basic: SamplerHandle,
    /// Clamped, linear; used for the sky
    pub clamp: SamplerHandle,
}

pub fn build_samplers(device: &mut dyn RenderDevice) -> anyhow::Result<Samplers> {
    let basic = device.create_sampler(&SamplerDesc::new(
        "basic_sampler",
        AddressMode::Wrap,
        FilterMode::Anisotropic(16),
    ))?;
    let clamp = device.create_sampler(&SamplerDesc::new(
        "clamp_sampler",
        AddressMode::Clamp,
        FilterMode::Linear,
    ))?;
    Ok(Samplers { basic, clamp })
}

/// Albedo, normal and roughness maps for one material
///
/// With an asset directory, `textures/<name>_albedo.png`,
/// `textures/<name>_normal.png` and `textures/<name>_roughness.png` are
/// used when present. Missing files fall back to generated maps.
fn material_maps(
    name: &str,
    checker: [u8; 4],
    asset_dir: Option<&Path>,
) -> anyhow::Result<[TextureData; 3]> {
    let load = |suffix: &str, srgb: bool| -> anyhow::Result<Option<TextureData>> {
        let Some(dir) = asset_dir else {
            return Ok(None);
        };
        let path = dir.join("textures").join(format!("{}_{}.png", name, suffix));
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(TextureData::from_file(&path, srgb)?))
    };

    let albedo = match load("albedo", true)? {
        Some(data) => data,
        None => TextureData::checkerboard(256, 8, [255, 255, 255, 255], checker),
    };
    let normal = match load("normal", false)? {
        Some(data) => data,
        None => TextureData::grooved_normal_map(256, 16),
    };
    let roughness = match load("roughness", false)? {
        Some(data) => data,
        None => TextureData::banded_roughness(256, 4, 0.6, 1.0),
    };
    Ok([albedo, normal, roughness])
}

/// The three demo materials, all drawn with the entity shaders
pub fn build_material_catalog(
    device: &mut dyn RenderDevice,
    shaders: &ShaderLibrary,
    sampler: SamplerHandle,
    asset_dir: Option<&Path>,
) -> anyhow::Result<(MaterialLibrary, Vec<MaterialId>)> {
    let mut library = MaterialLibrary::new();
    let mut ids = Vec::with_capacity(MATERIALS.len());

    for (name, tint, roughness, checker) in MATERIALS {
        let [albedo, normal, rough] = material_maps(name, checker, asset_dir)
            .with_context(|| format!("loading textures for material '{}'", name))?;
        let albedo = device.create_texture_2d(&format!("{}_albedo", name), &albedo)?;
        let normal = device.create_texture_2d(&format!("{}_normal", name), &normal)?;
        let rough = device.create_texture_2d(&format!("{}_roughness", name), &rough)?;

        let material = Material::new(
            name,
            Arc::clone(&shaders.entity_vs),
            Arc::clone(&shaders.entity_ps),
            tint,
            roughness,
        )
        .with_texture("albedo", albedo)
        .with_texture("normal_map", normal)
        .with_texture("roughness_map", rough)
        .with_sampler("basic_sampler", sampler);
        ids.push(library.add_material(material));
    }

    log::info!("built {} materials", library.len());
    Ok((library, ids))
}

/// Light 0 is the shadow caster
pub fn build_light_catalog() -> Vec<Light> {
    vec![
        Light::directional([0.5, -1.0, 0.5], [1.0, 1.0, 1.0], 1.0),
        Light::directional([-1.0, -0.25, 0.0], [0.6, 0.7, 1.0], 0.4),
        Light::point([0.0, 2.0, -2.0], 10.0, [1.0, 0.8, 0.6], 1.0),
        Light::spot(
            [3.0, 3.0, 0.0],
            [0.0, -1.0, 0.0],
            12.0,
            24.0,
            [0.8, 1.0, 0.8],
            1.5,
        ),
    ]
}

/// One straight ahead, one below looking up, one above looking down
pub fn build_cameras(aspect_ratio: f32) -> Vec<Camera> {
    let settings = CameraSettings::default();
    vec![
        Camera::new([0.0, 0.0, -3.0], [0.0, 0.0, 0.0], aspect_ratio, settings),
        Camera::new([0.0, -1.0, -1.0], [-0.7, 0.0, 0.0], aspect_ratio, settings),
        Camera::new([0.0, 1.0, -1.0], [0.7, 0.0, 0.0], aspect_ratio, settings),
    ]
}

fn procedural_shape(name: &str) -> MeshData {
    match name {
        "sphere" => generate_sphere(1.0, 32, 16),
        "cylinder" => generate_cylinder(1.0, 2.0, 32),
        "torus" => generate_torus(1.0, 0.35, 32, 16),
        "helix" => generate_helix(0.8, 0.2, 3.0, 2.0, 32, 12),
        _ => generate_cube(1.5),
    }
}

/// Shape meshes in entity order, then the floor
///
/// An `<asset_dir>/meshes/<name>.obj` replaces the generated shape of the
/// same name.
pub fn build_meshes(
    device: &mut dyn RenderDevice,
    asset_dir: Option<&Path>,
) -> anyhow::Result<Vec<Arc<Mesh>>> {
    let mut meshes = Vec::new();
    for name in ["sphere", "cylinder", "cube", "torus", "helix"] {
        let obj = asset_dir.map(|dir| dir.join("meshes").join(format!("{}.obj", name)));
        let mesh = match obj {
            Some(path) if path.exists() => Mesh::from_obj(device, &path)
                .with_context(|| format!("loading {}", path.display()))?,
            _ => Mesh::new(device, name, &procedural_shape(name))?,
        };
        meshes.push(Arc::new(mesh));
    }
    meshes.push(Arc::new(Mesh::new(
        device,
        "floor",
        &generate_plane(30.0, 30.0, 8, 8),
    )?));
    Ok(meshes)
}

/// Five shapes plus the floor. Expects [`build_meshes`] output and the IDs
/// from [`build_material_catalog`].
pub fn build_entities(meshes: &[Arc<Mesh>], materials: &[MaterialId]) -> Vec<Entity> {
    let mut entities: Vec<Entity> = meshes
        .iter()
        .zip(ENTITY_MATERIALS.iter().zip(ENTITY_POSITIONS))
        .map(|(mesh, (&material, position))| {
            let material = materials.get(material).cloned().unwrap_or_default();
            let mut entity = Entity::new(mesh.label(), Arc::clone(mesh), material);
            entity.transform_mut().set_position(position);
            entity
        })
        .collect();

    if let (Some(floor), Some(material)) = (meshes.get(ENTITY_MATERIALS.len()), materials.last()) {
        let mut entity = Entity::new("floor", Arc::clone(floor), material.clone());
        entity
            .transform_mut()
            .set_position(Vector3::new(0.0, FLOOR_HEIGHT, 0.0));
        entities.push(entity);
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::headless::HeadlessDevice;

    #[test]
    fn test_material_catalog() {
        let mut device = HeadlessDevice::new(64, 64);
        let shaders = ShaderLibrary::load(&mut device).unwrap();
        let samplers = build_samplers(&mut device).unwrap();
        let (library, ids) =
            build_material_catalog(&mut device, &shaders, samplers.basic, None).unwrap();

        assert_eq!(ids, vec!["yellow", "magenta", "cyan"]);
        let cyan = library.get("cyan").unwrap();
        assert_eq!(cyan.color_tint, cgmath::Vector4::new(0.3, 1.0, 1.0, 1.0));
        assert_eq!(cyan.roughness, 0.8);
        assert_eq!(cyan.textures().count(), 3);
        assert_eq!(cyan.sampler("basic_sampler"), Some(samplers.basic));
    }

    #[test]
    fn test_light_catalog_shadow_caster_first() {
        let lights = build_light_catalog();
        assert!(lights[0].direction().is_some());
        assert!(lights[0].position().is_none());
        assert_eq!(lights.len(), 4);
    }

    #[test]
    fn test_cameras_share_aspect() {
        let cameras = build_cameras(16.0 / 9.0);
        assert_eq!(cameras.len(), 3);
        assert!(cameras.iter().all(|c| c.aspect_ratio() == 16.0 / 9.0));
        assert_eq!(cameras[1].transform().pitch(), -0.7);
    }

    #[test]
    fn test_entities_follow_material_table() {
        let mut device = HeadlessDevice::new(64, 64);
        let meshes = build_meshes(&mut device, None).unwrap();
        let ids: Vec<MaterialId> = ["yellow", "magenta", "cyan"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let entities = build_entities(&meshes, &ids);

        assert_eq!(entities.len(), 6);
        let materials: Vec<_> = entities.iter().map(|e| e.material_id()).collect();
        assert_eq!(
            materials,
            vec!["yellow", "magenta", "cyan", "magenta", "cyan", "cyan"]
        );
        assert!(Arc::ptr_eq(entities[2].mesh(), &meshes[2]));
        assert_eq!(entities[1].transform().position(), Vector3::new(-2.0, 0.0, 0.0));
        assert_eq!(entities[5].transform().position().y, FLOOR_HEIGHT);
    }

    #[test]
    fn test_missing_asset_files_fall_back() {
        let dir = std::env::temp_dir().join("shadowbox_empty_assets");
        std::fs::create_dir_all(&dir).unwrap();
        let mut device = HeadlessDevice::new(64, 64);
        let meshes = build_meshes(&mut device, Some(&dir)).unwrap();
        assert_eq!(meshes[0].label(), "sphere");
    }
}
