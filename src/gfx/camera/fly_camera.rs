// src/gfx/camera/fly_camera.rs
//! Free-flying camera
//!
//! The camera owns its [`Transform`]. View and projection matrices are
//! cached and only rebuilt by [`Camera::update_view_matrix`] and
//! [`Camera::update_projection_matrix`]; [`Camera::update`] calls the former
//! after applying input.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use std::f32::consts::FRAC_PI_2;

use super::camera_controller::{read_movement, CameraMovement};
use crate::gfx::math::{look_to_lh, orthographic_lh, perspective_lh};
use crate::gfx::transform::Transform;
use crate::input::InputState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    /// Perspective projection using the camera's vertical field of view
    Perspective,
    /// Orthographic projection of a volume this many units tall; width follows the aspect ratio
    Orthographic { height: f32 },
}

/// Lens and control parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub projection: ProjectionMode,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: FRAC_PI_2,
            near: 0.01,
            far: 1000.0,
            move_speed: 5.0,
            mouse_sensitivity: 0.01,
            projection: ProjectionMode::Perspective,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    settings: CameraSettings,
    aspect_ratio: f32,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl Camera {
    pub const MIN_PITCH: f32 = -FRAC_PI_2;
    pub const MAX_PITCH: f32 = FRAC_PI_2;

    pub fn new(
        position: impl Into<Vector3<f32>>,
        pitch_yaw_roll: impl Into<Vector3<f32>>,
        aspect_ratio: f32,
        settings: CameraSettings,
    ) -> Self {
        let mut transform = Transform::from_position(position);
        transform.set_rotation(pitch_yaw_roll);
        transform.clamp_pitch(Self::MIN_PITCH, Self::MAX_PITCH);

        let mut camera = Self {
            transform,
            settings,
            aspect_ratio,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        };
        camera.update_view_matrix();
        camera.update_projection_matrix(aspect_ratio);
        camera
    }

    /// Applies one frame of input, then rebuilds the view matrix
    pub fn update(&mut self, dt: f32, input: &InputState) {
        let movement = read_movement(input);
        self.apply_movement(dt, &movement);
        self.update_view_matrix();
    }

    pub fn apply_movement(&mut self, dt: f32, movement: &CameraMovement) {
        let step = self.settings.move_speed * movement.speed_multiplier * dt;
        if movement.local != Vector3::new(0.0, 0.0, 0.0) {
            self.transform.move_relative(movement.local * step);
        }
        if movement.world_vertical != 0.0 {
            self.transform
                .move_absolute([0.0, movement.world_vertical * step, 0.0]);
        }
        if let Some(delta) = movement.look {
            self.look(delta.x, delta.y);
        }
    }

    /// Turns mouse motion (in pixels) into yaw and pitch, keeping pitch
    /// inside `[-π/2, π/2]`
    pub fn look(&mut self, dx: f32, dy: f32) {
        let sensitivity = self.settings.mouse_sensitivity;
        self.transform
            .rotate([dy * sensitivity, dx * sensitivity, 0.0]);
        self.transform
            .clamp_pitch(Self::MIN_PITCH, Self::MAX_PITCH);
    }

    pub fn update_view_matrix(&mut self) {
        self.view = look_to_lh(
            self.transform.position(),
            self.transform.forward(),
            self.transform.up(),
        );
    }

    pub fn update_projection_matrix(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        let s = &self.settings;
        self.projection = match s.projection {
            ProjectionMode::Perspective => perspective_lh(s.fov, aspect_ratio, s.near, s.far),
            ProjectionMode::Orthographic { height } => {
                orthographic_lh(height * aspect_ratio, height, s.near, s.far)
            }
        };
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position()
    }

    /// Moves the camera. The view matrix is left alone until the next
    /// [`Camera::update_view_matrix`].
    pub fn set_position(&mut self, position: impl Into<Vector3<f32>>) {
        self.transform.set_position(position);
    }

    pub fn fov(&self) -> f32 {
        self.settings.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.settings.fov = fov;
        self.update_projection_matrix(self.aspect_ratio);
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::math::test_util::{assert_matrix_near, assert_vec3_near};
    use winit::{event::MouseButton, keyboard::KeyCode};

    fn test_camera() -> Camera {
        Camera::new(
            [0.0, 0.0, -3.0],
            [0.0, 0.0, 0.0],
            16.0 / 9.0,
            CameraSettings::default(),
        )
    }

    #[test]
    fn test_pitch_stays_clamped_under_large_input() {
        let mut camera = test_camera();
        for _ in 0..100 {
            camera.look(0.0, 500.0);
            assert!(camera.transform().pitch() <= Camera::MAX_PITCH);
        }
        assert!((camera.transform().pitch() - Camera::MAX_PITCH).abs() < 1e-6);

        for _ in 0..100 {
            camera.look(13.0, -1234.0);
            assert!(camera.transform().pitch() >= Camera::MIN_PITCH);
        }
        assert!((camera.transform().pitch() - Camera::MIN_PITCH).abs() < 1e-6);
    }

    #[test]
    fn test_straight_down_view_is_finite() {
        let mut camera = test_camera();
        camera.look(0.0, 10_000.0);
        camera.update_view_matrix();
        let m: [[f32; 4]; 4] = camera.view_matrix().into();
        assert!(m.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_set_position_round_trip_leaves_view_until_recompute() {
        let mut camera = test_camera();
        let view_before = camera.view_matrix();

        camera.set_position([1.5, -2.0, 7.25]);
        assert_eq!(camera.position(), Vector3::new(1.5, -2.0, 7.25));
        assert_matrix_near(camera.view_matrix(), view_before, 0.0);

        camera.update_view_matrix();
        assert_ne!(camera.view_matrix(), view_before);
    }

    #[test]
    fn test_update_moves_forward_and_rebuilds_view() {
        let mut camera = test_camera();
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyW);
        input.press_key(KeyCode::ShiftLeft);

        camera.update(0.5, &input);
        // 5 units/s * 2 (shift) * 0.5s along +Z
        assert_vec3_near(camera.position(), Vector3::new(0.0, 0.0, 2.0), 1e-5);

        let expected = look_to_lh(
            camera.position(),
            Vector3::unit_z(),
            Vector3::unit_y(),
        );
        assert_matrix_near(camera.view_matrix(), expected, 1e-5);
    }

    #[test]
    fn test_space_moves_along_world_up_even_when_pitched() {
        let mut camera = test_camera();
        camera.transform_mut().set_rotation([0.7, 0.0, 0.0]);
        let mut input = InputState::new();
        input.press_key(KeyCode::Space);

        camera.update(1.0, &input);
        assert_vec3_near(camera.position(), Vector3::new(0.0, 5.0, -3.0), 1e-5);
    }

    #[test]
    fn test_q_raises_and_e_lowers_camera() {
        let mut camera = Camera::new([0.0; 3], [0.0; 3], 1.0, CameraSettings::default());
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyQ);
        camera.update(1.0, &input);
        assert_vec3_near(camera.position(), Vector3::new(0.0, 5.0, 0.0), 1e-5);

        input.release_key(KeyCode::KeyQ);
        input.press_key(KeyCode::KeyE);
        camera.update(2.0, &input);
        assert_vec3_near(camera.position(), Vector3::new(0.0, -5.0, 0.0), 1e-5);
    }

    #[test]
    fn test_mouse_look_only_while_button_held() {
        let mut camera = test_camera();
        let mut input = InputState::new();
        input.add_mouse_delta(10.0, 20.0);
        camera.update(0.016, &input);
        assert_eq!(camera.transform().rotation(), Vector3::new(0.0, 0.0, 0.0));

        input.press_mouse(MouseButton::Left);
        camera.update(0.016, &input);
        assert_vec3_near(
            camera.transform().rotation(),
            Vector3::new(0.2, 0.1, 0.0),
            1e-6,
        );
    }

    #[test]
    fn test_projection_tracks_aspect_and_fov() {
        let mut camera = test_camera();
        camera.update_projection_matrix(2.0);
        assert_eq!(camera.aspect_ratio(), 2.0);
        assert_matrix_near(
            camera.projection_matrix(),
            perspective_lh(FRAC_PI_2, 2.0, 0.01, 1000.0),
            1e-6,
        );

        camera.set_fov(std::f32::consts::FRAC_PI_4);
        assert_matrix_near(
            camera.projection_matrix(),
            perspective_lh(std::f32::consts::FRAC_PI_4, 2.0, 0.01, 1000.0),
            1e-6,
        );
    }

    #[test]
    fn test_orthographic_mode() {
        let settings = CameraSettings {
            projection: ProjectionMode::Orthographic { height: 10.0 },
            near: 1.0,
            far: 100.0,
            ..Default::default()
        };
        let camera = Camera::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 2.0, settings);
        assert_matrix_near(
            camera.projection_matrix(),
            orthographic_lh(20.0, 10.0, 1.0, 100.0),
            1e-6,
        );
    }
}
