// src/game/mod.rs
//! Scene orchestration
//!
//! [`Game`] owns every scene object and drives the frame:
//!
//! 1. **Init** builds shaders, materials, meshes, entities, cameras, lights,
//!    the shadow map, the post-process target and the sky ([`setup`]).
//! 2. Each frame, queued UI edits are applied, then [`Game::update`] moves
//!    the active camera and animates entities, then [`Game::draw`] records
//!    the passes in a fixed order.
//! 3. [`Game::on_resize`] refreshes projections and the post-process target.
//!
//! Nothing here touches wgpu. Drawing produces [`FrameCommands`] for the
//! backend to replay, which is what lets the whole frame run on a
//! [`HeadlessDevice`](crate::gfx::rendering::headless::HeadlessDevice) in
//! tests.

pub mod setup;

use anyhow::Context;
use cgmath::Vector3;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::sync::Arc;
use winit::keyboard::KeyCode;

use crate::config::GameConfig;
use crate::gfx::camera::Camera;
use crate::gfx::rendering::device::RenderDevice;
use crate::gfx::rendering::frame::{ColorTarget, FrameCommands, FrameRecorder};
use crate::gfx::rendering::post_process::PostProcess;
use crate::gfx::rendering::shader_library::ShaderLibrary;
use crate::gfx::rendering::shadow_map::ShadowMap;
use crate::gfx::resources::material::MaterialLibrary;
use crate::gfx::scene::entity::{DrawContext, Entity};
use crate::gfx::scene::light::{pack_lights, Light};
use crate::gfx::scene::mesh::Mesh;
use crate::gfx::scene::sky::Sky;
use crate::input::InputState;
use crate::ui::edits::{EntitySnapshot, LightSnapshot, PendingEdits, SceneEdit, SceneSnapshot};
use setup::ENTITY_POSITIONS;

pub const BACKGROUND_COLOR: [f32; 4] = [0.4, 0.6, 0.75, 1.0];
pub const AMBIENT_COLOR: [f32; 3] = [0.0, 0.1, 0.25];

/// Range offered by the FOV slider
pub const MIN_FOV: f32 = FRAC_PI_4;
pub const MAX_FOV: f32 = FRAC_PI_2;

pub struct Game {
    shaders: ShaderLibrary,
    materials: MaterialLibrary,
    meshes: Vec<Arc<Mesh>>,
    entities: Vec<Entity>,
    lights: Vec<Light>,
    cameras: Vec<Camera>,
    active_camera: usize,
    sky: Sky,
    shadow_map: ShadowMap,
    post_process: PostProcess,
    ambient_color: Vector3<f32>,
    window_size: (u32, u32),
    animate: bool,
    quit_requested: bool,
}

impl Game {
    /// Builds the whole scene. Any failure is fatal and names the phase
    /// that failed.
    pub fn init(device: &mut dyn RenderDevice, config: &GameConfig) -> anyhow::Result<Self> {
        let (width, height) = device.back_buffer_size();
        let asset_dir = config.asset_dir.as_deref();

        let shaders = ShaderLibrary::load(device).context("loading shaders")?;
        let samplers = setup::build_samplers(device).context("creating samplers")?;
        let (materials, material_ids) =
            setup::build_material_catalog(device, &shaders, samplers.basic, asset_dir)
                .context("building materials")?;
        let meshes = setup::build_meshes(device, asset_dir).context("building meshes")?;
        let entities = setup::build_entities(&meshes, &material_ids);
        let lights = setup::build_light_catalog();
        let cameras = setup::build_cameras(width as f32 / height.max(1) as f32);

        let shadow_direction = lights
            .first()
            .and_then(Light::direction)
            .unwrap_or_else(|| -Vector3::unit_y());
        let shadow_map = ShadowMap::new(
            device,
            config.shadow_resolution,
            config.shadow_projection_size,
            shadow_direction,
        )
        .context("allocating shadow map")?;

        let post_process = PostProcess::new(
            device,
            width,
            height,
            config.blur_radius,
            Arc::clone(&shaders.fullscreen_vs),
            Arc::clone(&shaders.blur_ps),
        )
        .context("allocating post-process target")?;

        let sky_dir = asset_dir.map(|dir| dir.join("sky")).filter(|dir| dir.is_dir());
        let faces = Sky::load_faces(sky_dir.as_deref()).context("loading sky faces")?;
        let sky_mesh = Arc::new(Sky::cube_mesh(device).context("building sky mesh")?);
        let sky = Sky::new(
            device,
            sky_mesh,
            samplers.clamp,
            &faces,
            Arc::clone(&shaders.sky_vs),
            Arc::clone(&shaders.sky_ps),
        )
        .context("creating sky")?;

        log::info!(
            "scene ready: {} entities, {} lights, {} cameras",
            entities.len(),
            lights.len(),
            cameras.len()
        );

        Ok(Self {
            shaders,
            materials,
            meshes,
            entities,
            lights,
            cameras,
            active_camera: 0,
            sky,
            shadow_map,
            post_process,
            ambient_color: AMBIENT_COLOR.into(),
            window_size: (width, height),
            animate: config.animate,
            quit_requested: false,
        })
    }

    /// Applies the UI's queued edits in order. Edits naming a camera, entity
    /// or light that does not exist are dropped.
    pub fn apply_edits(
        &mut self,
        device: &mut dyn RenderDevice,
        edits: &mut PendingEdits,
    ) -> anyhow::Result<()> {
        for edit in edits.drain() {
            match edit {
                SceneEdit::SetActiveCamera(index) => {
                    if index < self.cameras.len() {
                        self.active_camera = index;
                    } else {
                        log::warn!("no camera {}", index);
                    }
                }
                SceneEdit::SetCameraPosition { camera, position } => {
                    if let Some(camera) = self.cameras.get_mut(camera) {
                        camera.set_position(position);
                        camera.update_view_matrix();
                    }
                }
                SceneEdit::SetCameraFov { camera, fov } => {
                    if let Some(camera) = self.cameras.get_mut(camera) {
                        camera.set_fov(fov.clamp(MIN_FOV, MAX_FOV));
                    }
                }
                SceneEdit::SetEntityTransform {
                    entity,
                    position,
                    rotation,
                    scale,
                } => match self.entities.get_mut(entity) {
                    Some(entity) => {
                        let transform = entity.transform_mut();
                        transform.set_position(position);
                        transform.set_rotation(rotation);
                        transform.set_scale(scale);
                    }
                    None => log::warn!("no entity {}", entity),
                },
                SceneEdit::SetLightColor { light, color } => {
                    if let Some(light) = self.lights.get_mut(light) {
                        light.color = color.into();
                    }
                }
                SceneEdit::SetLightPosition { light, position } => {
                    if let Some(light) = self.lights.get_mut(light) {
                        light.set_position(position);
                    }
                }
                SceneEdit::SetLightDirection { light, direction } => {
                    let Some(target) = self.lights.get_mut(light) else {
                        continue;
                    };
                    if target.set_direction(direction) && light == 0 {
                        self.shadow_map.set_light_direction(direction);
                    }
                }
                SceneEdit::SetShadowResolution(resolution) => {
                    self.shadow_map
                        .set_resolution(device, resolution)
                        .context("resizing shadow map")?;
                }
                SceneEdit::SetShadowProjectionSize(size) => {
                    self.shadow_map.set_projection_size(size);
                }
                SceneEdit::SetBlurRadius(radius) => self.post_process.set_blur_radius(radius),
                SceneEdit::SetAmbientColor(color) => self.ambient_color = color.into(),
                SceneEdit::SetAnimation(animate) => self.animate = animate,
            }
        }
        Ok(())
    }

    /// Advances the active camera and, when enabled, the entity animation.
    /// `total` is seconds since start.
    pub fn update(&mut self, dt: f32, total: f32, input: &InputState) {
        if input.key_pressed(KeyCode::Escape) {
            self.quit_requested = true;
        }

        if let Some(camera) = self.cameras.get_mut(self.active_camera) {
            camera.update(dt, input);
        }

        if self.animate {
            self.animate_entities(total);
        }
    }

    fn animate_entities(&mut self, t: f32) {
        let wave = t.sin();
        for (index, entity) in self.entities.iter_mut().enumerate().take(ENTITY_POSITIONS.len()) {
            let transform = entity.transform_mut();
            let mut position = transform.position();
            match index {
                0 => position.x = 2.0 + wave,
                1 => position.x = wave - 2.0,
                2 => {
                    let rotation = transform.rotation();
                    transform.set_rotation([rotation.x, rotation.y, t]);
                    continue;
                }
                3 => position.y = 2.0 + wave,
                _ => position.y = wave - 2.0,
            }
            transform.set_position(position);
        }
    }

    /// Records one frame: shadow pass, clear, lighting upload, entities,
    /// sky, blur, UI overlay, unbind, present, then the default targets
    pub fn draw(&mut self, device: &dyn RenderDevice) -> FrameCommands {
        let mut recorder = FrameRecorder::new();
        let window_size = device.back_buffer_size();
        let main_depth = device.main_depth();
        let color = self.post_process.color_target();

        self.shadow_map.render(
            &mut recorder,
            &self.shaders.shadow_vs,
            &mut self.entities,
            window_size,
            color,
            main_depth,
        );

        recorder.clear_color(color, BACKGROUND_COLOR);
        recorder.clear_depth(main_depth, 1.0);

        let camera = &self.cameras[self.active_camera];

        let (lights, light_count) = pack_lights(&self.lights);
        let mut per_frame = self.shaders.entity_ps.parameters();
        per_frame.set_data("lights", bytemuck::cast_slice(&lights));
        per_frame.set_float3("ambient_color", self.ambient_color);
        per_frame.set_uint("light_count", light_count);
        per_frame.set_float3("camera_position", camera.position());
        per_frame.copy_all_buffer_data(&mut recorder);

        let context = DrawContext {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            light_view: self.shadow_map.light_view(),
            light_projection: self.shadow_map.light_projection(),
            shadow_map: self.shadow_map.shader_view(),
            shadow_sampler: self.shadow_map.sampler(),
        };
        for entity in &mut self.entities {
            entity.draw(&mut recorder, &self.materials, &context);
        }

        self.sky.draw(&mut recorder, camera);
        self.post_process.render(&mut recorder);

        recorder.draw_overlay();
        recorder.unbind_pixel_textures();
        recorder.present();
        recorder.set_render_targets(Some(ColorTarget::BackBuffer), Some(main_depth));
        recorder.finish()
    }

    /// Call after the device's own swap chain and depth buffer have been
    /// resized. A zero-sized (minimized) window is ignored.
    pub fn on_resize(
        &mut self,
        device: &mut dyn RenderDevice,
        width: u32,
        height: u32,
    ) -> anyhow::Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.window_size = (width, height);
        let aspect_ratio = width as f32 / height as f32;
        for camera in &mut self.cameras {
            camera.update_projection_matrix(aspect_ratio);
        }
        self.post_process
            .resize(device, width, height)
            .context("recreating post-process target")?;
        log::info!("resized to {}x{}", width, height);
        Ok(())
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        let camera = self.active_camera();
        SceneSnapshot {
            window_size: self.window_size,
            active_camera: self.active_camera,
            camera_count: self.cameras.len(),
            camera_position: camera.position().into(),
            camera_fov: camera.fov(),
            entities: self
                .entities
                .iter()
                .map(|entity| {
                    let transform = entity.transform();
                    EntitySnapshot {
                        name: entity.name.clone(),
                        position: transform.position().into(),
                        rotation: transform.rotation().into(),
                        scale: transform.scale().into(),
                    }
                })
                .collect(),
            lights: self
                .lights
                .iter()
                .map(|light| LightSnapshot {
                    kind: light.kind.name(),
                    color: light.color.into(),
                    position: light.position().map(Into::into),
                    direction: light.direction().map(Into::into),
                })
                .collect(),
            shadow_resolution: self.shadow_map.resolution(),
            shadow_projection_size: self.shadow_map.projection_size(),
            blur_radius: self.post_process.blur_radius(),
            ambient_color: self.ambient_color.into(),
            animate: self.animate,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn active_camera(&self) -> &Camera {
        &self.cameras[self.active_camera]
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    pub fn shadow_map(&self) -> &ShadowMap {
        &self.shadow_map
    }

    pub fn post_process(&self) -> &PostProcess {
        &self.post_process
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::math::test_util::{assert_matrix_near, assert_vec3_near};
    use crate::gfx::rendering::frame::RenderCommand;
    use crate::gfx::rendering::headless::HeadlessDevice;
    use crate::gfx::rendering::shadow_map::ShadowResolution;
    use crate::gfx::resources::shader::ShaderStage;

    fn game(device: &mut HeadlessDevice) -> Game {
        let config = GameConfig::default().with_shadow_resolution(ShadowResolution::R1024);
        Game::init(device, &config).unwrap()
    }

    fn index_of(frame: &FrameCommands, what: impl Fn(&RenderCommand) -> bool) -> usize {
        frame.position(what).expect("command not recorded")
    }

    #[test]
    fn test_init_builds_scene() {
        let mut device = HeadlessDevice::new(1280, 720);
        let game = game(&mut device);

        assert_eq!(game.entities().len(), 6);
        assert_eq!(game.lights().len(), 4);
        assert_eq!(game.cameras().len(), 3);
        assert_eq!(game.materials().len(), 3);
        assert_eq!(game.shadow_map().resolution(), ShadowResolution::R1024);
        assert_eq!(game.post_process().pixel_size(), [1.0 / 1280.0, 1.0 / 720.0]);
        assert!(!game.quit_requested());
    }

    #[test]
    fn test_draw_order() {
        let mut device = HeadlessDevice::new(1280, 720);
        let mut game = game(&mut device);
        let frame = game.draw(&device);

        let shadow_depth = game.shadow_map().depth_view();
        let post_target = game.post_process().color_target();
        let main_depth = device.main_depth();

        let shadow_clear = index_of(&frame, |c| {
            matches!(c, RenderCommand::ClearDepth { target, .. } if *target == shadow_depth)
        });
        let shadow_targets = index_of(&frame, |c| {
            *c == RenderCommand::SetRenderTargets {
                color: None,
                depth: Some(shadow_depth),
            }
        });
        let color_clear = index_of(&frame, |c| {
            matches!(c, RenderCommand::ClearColor { target, .. } if *target == post_target)
        });
        let lighting = index_of(&frame, |c| {
            matches!(
                c,
                RenderCommand::SetConstants {
                    stage: ShaderStage::Pixel,
                    binding: 1,
                    ..
                }
            )
        });
        let fullscreen = index_of(&frame, |c| *c == RenderCommand::Draw { vertex_count: 3 });
        let overlay = index_of(&frame, |c| *c == RenderCommand::DrawOverlay);
        let unbind = index_of(&frame, |c| *c == RenderCommand::UnbindPixelTextures);
        let present = index_of(&frame, |c| *c == RenderCommand::Present);

        assert_eq!(shadow_clear, 0);
        assert!(shadow_targets < color_clear);
        assert!(color_clear < lighting);
        assert!(lighting < fullscreen);
        assert!(fullscreen < overlay);
        assert!(overlay < unbind);
        assert!(unbind < present);
        assert_eq!(
            frame.commands().last(),
            Some(&RenderCommand::SetRenderTargets {
                color: Some(ColorTarget::BackBuffer),
                depth: Some(main_depth),
            })
        );

        // Six depth draws, six color draws, one sky cube
        let indexed = frame
            .commands()
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawIndexed { .. }))
            .count();
        assert_eq!(indexed, 13);

        device.submit(frame).unwrap();
    }

    #[test]
    fn test_shadow_pass_restores_color_targets() {
        let mut device = HeadlessDevice::new(640, 480);
        let mut game = game(&mut device);
        let frame = game.draw(&device);
        let post_target = game.post_process().color_target();

        let restore = index_of(&frame, |c| {
            *c == RenderCommand::SetRenderTargets {
                color: Some(post_target),
                depth: Some(device.main_depth()),
            }
        });
        let viewport = index_of(&frame, |c| {
            *c == RenderCommand::SetViewport {
                width: 640,
                height: 480,
            }
        });
        assert_eq!(viewport + 1, restore);
        assert!(matches!(
            frame.commands()[2],
            RenderCommand::SetViewport {
                width: 1024,
                height: 1024
            }
        ));
    }

    #[test]
    fn test_resize_updates_projection_and_post() {
        let mut device = HeadlessDevice::new(1280, 720);
        let mut game = game(&mut device);
        let positions: Vec<_> = game.cameras().iter().map(|c| c.position()).collect();
        let old_target = game.post_process().target().shader_view;

        device.resize(800, 800);
        game.on_resize(&mut device, 800, 800).unwrap();

        for (camera, before) in game.cameras().iter().zip(positions) {
            assert_eq!(camera.aspect_ratio(), 1.0);
            assert_eq!(camera.position(), before);
        }
        assert_eq!(game.post_process().pixel_size(), [1.0 / 800.0, 1.0 / 800.0]);
        assert!(!device.is_live(old_target));
        assert_eq!(game.snapshot().window_size, (800, 800));

        let frame = game.draw(&device);
        device.submit(frame).unwrap();
    }

    #[test]
    fn test_minimized_resize_is_ignored() {
        let mut device = HeadlessDevice::new(1280, 720);
        let mut game = game(&mut device);
        game.on_resize(&mut device, 0, 0).unwrap();
        assert_eq!(game.active_camera().aspect_ratio(), 1280.0 / 720.0);
        assert_eq!(game.snapshot().window_size, (1280, 720));
    }

    #[test]
    fn test_shadow_resolution_edit_keeps_matrices() {
        let mut device = HeadlessDevice::new(256, 256);
        let mut game = game(&mut device);
        let view = game.shadow_map().light_view();
        let projection = game.shadow_map().light_projection();
        let old = game.shadow_map().shader_view();

        let mut edits = PendingEdits::new();
        edits.push(SceneEdit::SetShadowResolution(ShadowResolution::R4096));
        game.apply_edits(&mut device, &mut edits).unwrap();

        assert!(edits.is_empty());
        assert!(!device.is_live(old));
        let info = device.texture(game.shadow_map().shader_view()).unwrap();
        assert_eq!((info.width, info.height), (4096, 4096));
        assert_matrix_near(game.shadow_map().light_view(), view, 0.0);
        assert_matrix_near(game.shadow_map().light_projection(), projection, 0.0);

        let frame = game.draw(&device);
        device.submit(frame).unwrap();
    }

    #[test]
    fn test_sun_direction_edit_moves_shadow() {
        let mut device = HeadlessDevice::new(256, 256);
        let mut game = game(&mut device);
        let texture = game.shadow_map().shader_view();

        let mut edits = PendingEdits::new();
        edits.push(SceneEdit::SetLightDirection {
            light: 0,
            direction: [0.0, -1.0, 0.0],
        });
        // Not the shadow caster
        edits.push(SceneEdit::SetLightDirection {
            light: 1,
            direction: [1.0, 0.0, 0.0],
        });
        game.apply_edits(&mut device, &mut edits).unwrap();

        assert_vec3_near(game.shadow_map().light_direction(), -Vector3::unit_y(), 1e-6);
        assert_eq!(game.shadow_map().shader_view(), texture);
        assert_eq!(game.lights()[1].direction(), Some(Vector3::unit_x()));
    }

    #[test]
    fn test_edits_apply_to_scene() {
        let mut device = HeadlessDevice::new(256, 256);
        let mut game = game(&mut device);

        let mut edits = PendingEdits::new();
        edits.push(SceneEdit::SetActiveCamera(2));
        edits.push(SceneEdit::SetCameraFov {
            camera: 2,
            fov: 3.0,
        });
        edits.push(SceneEdit::SetEntityTransform {
            entity: 4,
            position: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.5, 0.0],
            scale: [2.0, 2.0, 2.0],
        });
        edits.push(SceneEdit::SetBlurRadius(4));
        edits.push(SceneEdit::SetAmbientColor([0.2, 0.2, 0.2]));
        edits.push(SceneEdit::SetAnimation(false));
        edits.push(SceneEdit::SetActiveCamera(99));
        edits.push(SceneEdit::SetLightColor {
            light: 99,
            color: [1.0; 3],
        });
        game.apply_edits(&mut device, &mut edits).unwrap();

        let snapshot = game.snapshot();
        assert_eq!(snapshot.active_camera, 2);
        assert_eq!(snapshot.camera_fov, MAX_FOV);
        assert_eq!(snapshot.entities[4].position, [1.0, 2.0, 3.0]);
        assert_eq!(snapshot.entities[4].scale, [2.0, 2.0, 2.0]);
        assert_eq!(snapshot.blur_radius, 4);
        assert_eq!(snapshot.ambient_color, [0.2, 0.2, 0.2]);
        assert!(!snapshot.animate);
    }

    #[test]
    fn test_camera_position_edit_refreshes_view() {
        let mut device = HeadlessDevice::new(256, 256);
        let mut game = game(&mut device);
        let before = game.active_camera().view_matrix();

        let mut edits = PendingEdits::new();
        edits.push(SceneEdit::SetCameraPosition {
            camera: 0,
            position: [0.0, 0.0, -10.0],
        });
        game.apply_edits(&mut device, &mut edits).unwrap();

        assert_eq!(game.active_camera().position(), Vector3::new(0.0, 0.0, -10.0));
        assert_ne!(game.active_camera().view_matrix(), before);
    }

    #[test]
    fn test_animation_follows_time() {
        let mut device = HeadlessDevice::new(256, 256);
        let mut game = game(&mut device);
        let input = InputState::new();

        let t = 1.3_f32;
        game.update(0.016, t, &input);
        let e = game.entities();
        assert!((e[0].transform().position().x - (2.0 + t.sin())).abs() < 1e-6);
        assert!((e[1].transform().position().x - (t.sin() - 2.0)).abs() < 1e-6);
        assert_eq!(e[2].transform().rotation().z, t);
        assert!((e[3].transform().position().y - (2.0 + t.sin())).abs() < 1e-6);
        assert!((e[4].transform().position().y - (t.sin() - 2.0)).abs() < 1e-6);
        assert_eq!(e[5].transform().position().y, setup::FLOOR_HEIGHT);
    }

    #[test]
    fn test_paused_animation_leaves_entities() {
        let mut device = HeadlessDevice::new(256, 256);
        let config = GameConfig::default().with_animation(false);
        let mut game = Game::init(&mut device, &config).unwrap();
        game.update(0.016, 5.0, &InputState::new());
        assert_eq!(game.entities()[0].transform().position().x, 2.0);
    }

    #[test]
    fn test_escape_requests_quit() {
        let mut device = HeadlessDevice::new(256, 256);
        let mut game = game(&mut device);
        let mut input = InputState::new();
        input.press_key(KeyCode::Escape);
        game.update(0.016, 0.0, &input);
        assert!(game.quit_requested());
    }

    fn matrix_bytes(m: cgmath::Matrix4<f32>) -> Vec<u8> {
        let columns: [[f32; 4]; 4] = m.into();
        bytemuck::cast_slice(&columns).to_vec()
    }

    fn vertex_constants_after(frame: &FrameCommands, start: usize) -> &[u8] {
        frame.commands()[start..]
            .iter()
            .find_map(|c| match c {
                RenderCommand::SetConstants {
                    stage: ShaderStage::Vertex,
                    data,
                    ..
                } => Some(data.as_slice()),
                _ => None,
            })
            .expect("no vertex constants")
    }

    #[test]
    fn test_sun_overhead_shadows_entity_at_origin() {
        let mut device = HeadlessDevice::new(640, 480);
        let mut game = game(&mut device);
        game.entities.truncate(1);
        game.entities[0].transform_mut().set_position([0.0, 0.0, 0.0]);
        game.lights = vec![Light::directional([0.0, -1.0, 0.0], [1.0; 3], 1.0)];
        game.shadow_map.set_light_direction([0.0, -1.0, 0.0]);
        let frame = game.draw(&device);

        let shadow_depth = game.shadow_map().depth_view();
        let shadow_start = index_of(&frame, |c| {
            *c == RenderCommand::SetRenderTargets {
                color: None,
                depth: Some(shadow_depth),
            }
        });
        let color_start = index_of(&frame, |c| {
            *c == RenderCommand::SetRenderTargets {
                color: Some(game.post_process().color_target()),
                depth: Some(device.main_depth()),
            }
        });
        assert!(shadow_start < color_start);

        // Shadow VS block: world, view, projection
        let light_view = matrix_bytes(game.shadow_map().light_view());
        let light_projection = matrix_bytes(game.shadow_map().light_projection());
        let depth_block = vertex_constants_after(&frame, shadow_start);
        assert_eq!(&depth_block[64..128], light_view.as_slice());
        assert_eq!(&depth_block[128..192], light_projection.as_slice());

        // Entity VS block: world, view, projection, light_view, light_projection
        let color_block = vertex_constants_after(&frame, color_start);
        assert_eq!(&color_block[192..256], &depth_block[64..128]);
        assert_eq!(&color_block[256..320], &depth_block[128..192]);

        let shadow_bind = index_of(&frame, |c| {
            *c == RenderCommand::BindTexture {
                stage: ShaderStage::Pixel,
                binding: 5,
                texture: game.shadow_map().shader_view(),
            }
        });
        assert!(shadow_bind > color_start);

        // The origin lands mid-map, inside the depth range
        let clip = game.shadow_map().light_projection()
            * game.shadow_map().light_view()
            * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);

        device.submit(frame).unwrap();
    }

    #[test]
    fn test_snapshot_lists_lights() {
        let mut device = HeadlessDevice::new(256, 256);
        let game = game(&mut device);
        let snapshot = game.snapshot();
        let kinds: Vec<_> = snapshot.lights.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec!["Directional", "Directional", "Point", "Spot"]);
        assert!(snapshot.lights[0].position.is_none());
        assert!(snapshot.lights[2].direction.is_none());
    }
}
