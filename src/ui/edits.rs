// src/ui/edits.rs
//! Data exchanged between the debug panel and the game
//!
//! The panel never touches scene objects. Each frame it reads a
//! [`SceneSnapshot`] and queues [`SceneEdit`]s, which the game applies once,
//! before its update.

use crate::gfx::rendering::shadow_map::ShadowResolution;

#[derive(Debug, Clone, PartialEq)]
pub enum SceneEdit {
    SetActiveCamera(usize),
    SetCameraPosition {
        camera: usize,
        position: [f32; 3],
    },
    SetCameraFov {
        camera: usize,
        fov: f32,
    },
    SetEntityTransform {
        entity: usize,
        position: [f32; 3],
        rotation: [f32; 3],
        scale: [f32; 3],
    },
    SetLightColor {
        light: usize,
        color: [f32; 3],
    },
    SetLightPosition {
        light: usize,
        position: [f32; 3],
    },
    SetLightDirection {
        light: usize,
        direction: [f32; 3],
    },
    SetShadowResolution(ShadowResolution),
    SetShadowProjectionSize(f32),
    SetBlurRadius(u32),
    SetAmbientColor([f32; 3]),
    SetAnimation(bool),
}

/// Edits queued by the UI during one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingEdits {
    edits: Vec<SceneEdit>,
}

impl PendingEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: SceneEdit) {
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Removes and yields every queued edit in the order it was made
    pub fn drain(&mut self) -> std::vec::Drain<'_, SceneEdit> {
        self.edits.drain(..)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub name: String,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightSnapshot {
    pub kind: &'static str,
    pub color: [f32; 3],
    pub position: Option<[f32; 3]>,
    pub direction: Option<[f32; 3]>,
}

/// Read-only view of everything the debug panel shows
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSnapshot {
    pub window_size: (u32, u32),
    pub active_camera: usize,
    pub camera_count: usize,
    pub camera_position: [f32; 3],
    pub camera_fov: f32,
    pub entities: Vec<EntitySnapshot>,
    pub lights: Vec<LightSnapshot>,
    pub shadow_resolution: ShadowResolution,
    pub shadow_projection_size: f32,
    pub blur_radius: u32,
    pub ambient_color: [f32; 3],
    pub animate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let mut edits = PendingEdits::new();
        edits.push(SceneEdit::SetBlurRadius(3));
        edits.push(SceneEdit::SetActiveCamera(1));
        assert_eq!(edits.len(), 2);

        let drained: Vec<_> = edits.drain().collect();
        assert_eq!(
            drained,
            vec![SceneEdit::SetBlurRadius(3), SceneEdit::SetActiveCamera(1)]
        );
        assert!(edits.is_empty());
    }
}
