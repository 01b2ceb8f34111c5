// src/gfx/camera/camera_controller.rs
//! Keyboard / mouse mapping for the fly camera

use cgmath::{Vector2, Vector3, Zero};
use winit::{event::MouseButton, keyboard::KeyCode};

use crate::input::InputState;

/// One frame's worth of camera intent, already decoded from raw input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMovement {
    /// Unit steps along the camera's own right / up / forward axes
    pub local: Vector3<f32>,
    /// Unit steps along world Y
    pub world_vertical: f32,
    /// Multiplier from the modifier keys
    pub speed_multiplier: f32,
    /// Mouse delta in pixels, only present while a look button is held
    pub look: Option<Vector2<f32>>,
}

impl Default for CameraMovement {
    fn default() -> Self {
        Self {
            local: Vector3::zero(),
            world_vertical: 0.0,
            speed_multiplier: 1.0,
            look: None,
        }
    }
}

/// Reads the fly-camera bindings
///
/// W/S forward and back, A/D strafe, Q/E up and down along the camera's up
/// axis, Space/X up and down along world Y. Shift doubles speed and Alt
/// halves it. Holding either mouse button turns mouse motion into look.
pub fn read_movement(input: &InputState) -> CameraMovement {
    let mut movement = CameraMovement::default();
    let axis = |positive: KeyCode, negative: KeyCode| -> f32 {
        let mut value = 0.0;
        if input.key_down(positive) {
            value += 1.0;
        }
        if input.key_down(negative) {
            value -= 1.0;
        }
        value
    };

    movement.local = Vector3::new(
        axis(KeyCode::KeyD, KeyCode::KeyA),
        axis(KeyCode::KeyQ, KeyCode::KeyE),
        axis(KeyCode::KeyW, KeyCode::KeyS),
    );
    movement.world_vertical = axis(KeyCode::Space, KeyCode::KeyX);

    if input.key_down(KeyCode::ShiftLeft) || input.key_down(KeyCode::ShiftRight) {
        movement.speed_multiplier *= 2.0;
    }
    if input.key_down(KeyCode::AltLeft) || input.key_down(KeyCode::AltRight) {
        movement.speed_multiplier *= 0.5;
    }

    if input.mouse_down(MouseButton::Left) || input.mouse_down(MouseButton::Right) {
        movement.look = Some(input.mouse_delta());
    }

    movement
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposing_keys_cancel() {
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyW);
        input.press_key(KeyCode::KeyS);
        input.press_key(KeyCode::KeyD);

        let movement = read_movement(&input);
        assert_eq!(movement.local, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_q_is_local_up() {
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyQ);
        assert_eq!(read_movement(&input).local, Vector3::new(0.0, 1.0, 0.0));

        input.release_key(KeyCode::KeyQ);
        input.press_key(KeyCode::KeyE);
        assert_eq!(read_movement(&input).local, Vector3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_modifiers_scale_speed() {
        let mut input = InputState::new();
        input.press_key(KeyCode::ShiftLeft);
        assert_eq!(read_movement(&input).speed_multiplier, 2.0);

        input.press_key(KeyCode::AltRight);
        assert_eq!(read_movement(&input).speed_multiplier, 1.0);

        input.release_key(KeyCode::ShiftLeft);
        assert_eq!(read_movement(&input).speed_multiplier, 0.5);
    }

    #[test]
    fn test_look_requires_mouse_button() {
        let mut input = InputState::new();
        input.add_mouse_delta(4.0, 2.0);
        assert_eq!(read_movement(&input).look, None);

        input.press_mouse(MouseButton::Right);
        assert_eq!(read_movement(&input).look, Some(Vector2::new(4.0, 2.0)));
    }
}
