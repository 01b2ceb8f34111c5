// src/ui/panel.rs
//! The debug panel
//!
//! Reads a [`SceneSnapshot`] and queues a [`SceneEdit`] for every widget the
//! user changed this frame. Nothing in the scene is touched directly.

use imgui::{Condition, Drag, TreeNodeFlags};

use super::edits::{EntitySnapshot, LightSnapshot, PendingEdits, SceneEdit, SceneSnapshot};
use crate::game::{MAX_FOV, MIN_FOV};
use crate::gfx::rendering::post_process::MAX_BLUR_RADIUS;
use crate::gfx::rendering::shadow_map::ShadowResolution;

/// Panel-local state that is not part of the scene
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    pub show_demo_window: bool,
}

pub fn debug_panel(
    ui: &imgui::Ui,
    snapshot: &SceneSnapshot,
    state: &mut PanelState,
    edits: &mut PendingEdits,
) {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return;
    }

    ui.window("Inspector")
        .size([360.0, display_size[1] * 0.8], Condition::FirstUseEver)
        .position([20.0, 20.0], Condition::FirstUseEver)
        .resizable(true)
        .collapsible(true)
        .build(|| {
            render_app_info(ui, snapshot, state);
            render_camera_controls(ui, snapshot, edits);
            render_entity_tree(ui, &snapshot.entities, edits);
            render_light_controls(ui, &snapshot.lights, edits);
            render_render_settings(ui, snapshot, edits);
        });

    if state.show_demo_window {
        ui.show_demo_window(&mut state.show_demo_window);
    }
}

fn render_app_info(ui: &imgui::Ui, snapshot: &SceneSnapshot, state: &mut PanelState) {
    if ui.collapsing_header("App Data", TreeNodeFlags::DEFAULT_OPEN) {
        ui.text(format!(
            "Window: {}x{}",
            snapshot.window_size.0, snapshot.window_size.1
        ));
        ui.text(format!("FPS: {:.1}", ui.io().framerate));
        ui.checkbox("Show demo window", &mut state.show_demo_window);
    }
}

fn render_camera_controls(ui: &imgui::Ui, snapshot: &SceneSnapshot, edits: &mut PendingEdits) {
    if !ui.collapsing_header("Camera", TreeNodeFlags::DEFAULT_OPEN) {
        return;
    }

    let mut active = snapshot.active_camera;
    for i in 0..snapshot.camera_count {
        if i > 0 {
            ui.same_line();
        }
        if ui.radio_button(format!("Camera {}", i), &mut active, i) {
            edits.push(SceneEdit::SetActiveCamera(i));
        }
    }

    let camera = snapshot.active_camera;
    let mut position = snapshot.camera_position;
    if Drag::new("Position")
        .speed(0.01)
        .build_array(ui, &mut position)
    {
        edits.push(SceneEdit::SetCameraPosition { camera, position });
    }

    let mut fov = snapshot.camera_fov;
    if ui.slider("FOV", MIN_FOV, MAX_FOV, &mut fov) {
        edits.push(SceneEdit::SetCameraFov { camera, fov });
    }
}

fn render_entity_tree(ui: &imgui::Ui, entities: &[EntitySnapshot], edits: &mut PendingEdits) {
    if !ui.collapsing_header("Entities", TreeNodeFlags::empty()) {
        return;
    }

    for (i, entity) in entities.iter().enumerate() {
        let _id = ui.push_id_usize(i);
        if let Some(_node) = ui.tree_node(format!("{} ({})", entity.name, i)) {
            let mut edited = entity.clone();
            let mut changed = Drag::new("Position")
                .speed(0.01)
                .build_array(ui, &mut edited.position);
            changed |= Drag::new("Rotation")
                .speed(0.01)
                .build_array(ui, &mut edited.rotation);
            changed |= Drag::new("Scale")
                .speed(0.01)
                .range(0.01, 100.0)
                .build_array(ui, &mut edited.scale);
            if changed {
                edits.push(entity_edit(i, &edited));
            }
        }
    }
}

fn render_light_controls(ui: &imgui::Ui, lights: &[LightSnapshot], edits: &mut PendingEdits) {
    if !ui.collapsing_header("Lights", TreeNodeFlags::empty()) {
        return;
    }

    for (i, light) in lights.iter().enumerate() {
        let _id = ui.push_id_usize(i);
        if let Some(_node) = ui.tree_node(format!("{} light {}", light.kind, i)) {
            let mut color = light.color;
            if ui.color_edit3("Color", &mut color) {
                edits.push(SceneEdit::SetLightColor { light: i, color });
            }
            if let Some(mut position) = light.position {
                if Drag::new("Position")
                    .speed(0.01)
                    .build_array(ui, &mut position)
                {
                    edits.push(SceneEdit::SetLightPosition { light: i, position });
                }
            }
            if let Some(mut direction) = light.direction {
                if Drag::new("Direction")
                    .speed(0.01)
                    .range(-1.0, 1.0)
                    .build_array(ui, &mut direction)
                {
                    edits.push(SceneEdit::SetLightDirection {
                        light: i,
                        direction,
                    });
                }
            }
        }
    }
}

fn render_render_settings(ui: &imgui::Ui, snapshot: &SceneSnapshot, edits: &mut PendingEdits) {
    if !ui.collapsing_header("Rendering", TreeNodeFlags::DEFAULT_OPEN) {
        return;
    }

    let labels = ShadowResolution::ALL.map(|r| r.label());
    let mut selected = resolution_index(snapshot.shadow_resolution);
    if ui.combo_simple_string("Shadow resolution", &mut selected, &labels) {
        if let Some(&resolution) = ShadowResolution::ALL.get(selected) {
            if resolution != snapshot.shadow_resolution {
                edits.push(SceneEdit::SetShadowResolution(resolution));
            }
        }
    }

    let mut projection_size = snapshot.shadow_projection_size;
    if ui.slider("Shadow projection", 5.0, 100.0, &mut projection_size) {
        edits.push(SceneEdit::SetShadowProjectionSize(projection_size));
    }

    let mut blur_radius = snapshot.blur_radius;
    if ui.slider("Blur radius", 0, MAX_BLUR_RADIUS, &mut blur_radius) {
        edits.push(SceneEdit::SetBlurRadius(blur_radius));
    }

    let mut ambient = snapshot.ambient_color;
    if ui.color_edit3("Ambient", &mut ambient) {
        edits.push(SceneEdit::SetAmbientColor(ambient));
    }

    let mut animate = snapshot.animate;
    if ui.checkbox("Animate", &mut animate) {
        edits.push(SceneEdit::SetAnimation(animate));
    }
}

fn entity_edit(entity: usize, edited: &EntitySnapshot) -> SceneEdit {
    SceneEdit::SetEntityTransform {
        entity,
        position: edited.position,
        rotation: edited.rotation,
        scale: edited.scale,
    }
}

fn resolution_index(resolution: ShadowResolution) -> usize {
    ShadowResolution::ALL
        .iter()
        .position(|&r| r == resolution)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SceneSnapshot {
        SceneSnapshot {
            window_size: (800, 600),
            active_camera: 0,
            camera_count: 3,
            camera_position: [0.0, 0.0, -3.0],
            camera_fov: std::f32::consts::FRAC_PI_3,
            entities: vec![EntitySnapshot {
                name: "sphere".to_string(),
                position: [2.0, 0.0, 0.0],
                rotation: [0.0; 3],
                scale: [1.0; 3],
            }],
            lights: vec![LightSnapshot {
                kind: "Directional",
                color: [1.0; 3],
                position: None,
                direction: Some([0.0, -1.0, 0.0]),
            }],
            shadow_resolution: ShadowResolution::R2048,
            shadow_projection_size: 20.0,
            blur_radius: 0,
            ambient_color: [0.0, 0.1, 0.25],
            animate: true,
        }
    }

    #[test]
    fn test_idle_frame_queues_nothing() {
        let mut context = imgui::Context::create();
        context.set_ini_filename(None);
        context.io_mut().display_size = [800.0, 600.0];
        context.fonts().build_rgba32_texture();

        let mut state = PanelState::default();
        let mut edits = PendingEdits::new();
        let ui = context.new_frame();
        debug_panel(ui, &snapshot(), &mut state, &mut edits);
        context.render();

        assert!(edits.is_empty());
        assert!(!state.show_demo_window);
    }

    #[test]
    fn test_resolution_index_round_trips() {
        for (i, resolution) in ShadowResolution::ALL.into_iter().enumerate() {
            assert_eq!(resolution_index(resolution), i);
        }
    }

    #[test]
    fn test_entity_edit_carries_whole_transform() {
        let mut edited = snapshot().entities[0].clone();
        edited.scale = [2.0, 1.0, 1.0];
        assert_eq!(
            entity_edit(0, &edited),
            SceneEdit::SetEntityTransform {
                entity: 0,
                position: [2.0, 0.0, 0.0],
                rotation: [0.0; 3],
                scale: [2.0, 1.0, 1.0],
            }
        );
    }
}
