// src/gfx/transform.rs
//! Position / rotation / scale with lazily rebuilt matrices
//!
//! Every mutator marks the transform dirty. The matrix getters rebuild both
//! the world matrix and its inverse-transpose on the first read after a
//! mutation, so repeated reads within a frame cost nothing.

use cgmath::{Matrix, Matrix4, Rad, SquareMatrix, Vector3, Zero};

/// Object placement in world space
///
/// Rotation is stored as (pitch, yaw, roll) in radians and applied roll
/// first, then pitch, then yaw. The world matrix applies scale, then
/// rotation, then translation.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    scale: Vector3<f32>,
    world: Matrix4<f32>,
    world_inverse_transpose: Matrix4<f32>,
    dirty: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            world: Matrix4::identity(),
            world_inverse_transpose: Matrix4::identity(),
            dirty: false,
        }
    }

    pub fn from_position(position: impl Into<Vector3<f32>>) -> Self {
        let mut transform = Self::new();
        transform.set_position(position);
        transform
    }

    pub fn set_position(&mut self, position: impl Into<Vector3<f32>>) {
        self.position = position.into();
        self.dirty = true;
    }

    /// Sets (pitch, yaw, roll) in radians
    pub fn set_rotation(&mut self, pitch_yaw_roll: impl Into<Vector3<f32>>) {
        self.rotation = pitch_yaw_roll.into();
        self.dirty = true;
    }

    pub fn set_scale(&mut self, scale: impl Into<Vector3<f32>>) {
        self.scale = scale.into();
        self.dirty = true;
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn pitch(&self) -> f32 {
        self.rotation.x
    }

    /// Moves along world axes
    pub fn move_absolute(&mut self, offset: impl Into<Vector3<f32>>) {
        self.position += offset.into();
        self.dirty = true;
    }

    /// Moves along the transform's own axes: the offset is rotated into
    /// world space before it is added to the position.
    pub fn move_relative(&mut self, offset: impl Into<Vector3<f32>>) {
        let offset: Vector3<f32> = offset.into();
        let world_offset = self.rotation_matrix() * offset.extend(0.0);
        self.position += world_offset.truncate();
        self.dirty = true;
    }

    /// Adds to (pitch, yaw, roll)
    pub fn rotate(&mut self, pitch_yaw_roll: impl Into<Vector3<f32>>) {
        self.rotation += pitch_yaw_roll.into();
        self.dirty = true;
    }

    /// Clamps pitch into `[min, max]` without touching yaw or roll
    pub fn clamp_pitch(&mut self, min: f32, max: f32) {
        let clamped = self.rotation.x.clamp(min, max);
        if clamped != self.rotation.x {
            self.rotation.x = clamped;
            self.dirty = true;
        }
    }

    /// Component-wise multiplies the current scale
    pub fn scale_by(&mut self, factors: impl Into<Vector3<f32>>) {
        let factors: Vector3<f32> = factors.into();
        self.scale.x *= factors.x;
        self.scale.y *= factors.y;
        self.scale.z *= factors.z;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn world_matrix(&mut self) -> Matrix4<f32> {
        self.update_matrices();
        self.world
    }

    /// Transpose of the inverse world matrix, used to move normals
    pub fn world_inverse_transpose_matrix(&mut self) -> Matrix4<f32> {
        self.update_matrices();
        self.world_inverse_transpose
    }

    pub fn forward(&self) -> Vector3<f32> {
        (self.rotation_matrix() * Vector3::unit_z().extend(0.0)).truncate()
    }

    pub fn right(&self) -> Vector3<f32> {
        (self.rotation_matrix() * Vector3::unit_x().extend(0.0)).truncate()
    }

    pub fn up(&self) -> Vector3<f32> {
        (self.rotation_matrix() * Vector3::unit_y().extend(0.0)).truncate()
    }

    fn rotation_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_z(Rad(self.rotation.z))
    }

    fn update_matrices(&mut self) {
        if !self.dirty {
            return;
        }

        self.world = compose_world(self.position, self.rotation_matrix(), self.scale);
        // Singular worlds (zero scale) have no inverse; identity keeps normals finite
        self.world_inverse_transpose = self
            .world
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);
        self.dirty = false;
    }
}

fn compose_world(
    position: Vector3<f32>,
    rotation: Matrix4<f32>,
    scale: Vector3<f32>,
) -> Matrix4<f32> {
    Matrix4::from_translation(position)
        * rotation
        * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::math::test_util::{assert_matrix_near, assert_vec3_near};
    use std::f32::consts::FRAC_PI_2;

    fn direct_world(t: &Transform) -> Matrix4<f32> {
        let r = t.rotation();
        let s = t.scale();
        Matrix4::from_translation(t.position())
            * Matrix4::from_angle_y(Rad(r.y))
            * Matrix4::from_angle_x(Rad(r.x))
            * Matrix4::from_angle_z(Rad(r.z))
            * Matrix4::from_nonuniform_scale(s.x, s.y, s.z)
    }

    #[test]
    fn test_new_transform_is_identity() {
        let mut t = Transform::new();
        assert!(!t.is_dirty());
        assert_matrix_near(t.world_matrix(), Matrix4::identity(), 0.0);
    }

    #[test]
    fn test_cached_world_never_stale() {
        let mut t = Transform::new();
        let mutations: Vec<Box<dyn Fn(&mut Transform)>> = vec![
            Box::new(|t: &mut Transform| t.set_position([1.0, 2.0, 3.0])),
            Box::new(|t: &mut Transform| t.rotate([0.3, -0.2, 0.1])),
            Box::new(|t: &mut Transform| t.scale_by([2.0, 0.5, 1.5])),
            Box::new(|t: &mut Transform| t.move_absolute([-1.0, 0.0, 4.0])),
            Box::new(|t: &mut Transform| t.move_relative([0.0, 0.0, 2.0])),
            Box::new(|t: &mut Transform| t.set_rotation([0.0, FRAC_PI_2, 0.0])),
            Box::new(|t: &mut Transform| t.set_scale([3.0, 3.0, 0.25])),
        ];

        for (i, mutate) in mutations.iter().enumerate() {
            mutate(&mut t);
            assert!(t.is_dirty());
            // Read on every other step so the cache is exercised both ways
            if i % 2 == 0 {
                assert_matrix_near(t.world_matrix(), direct_world(&t), 1e-5);
                assert!(!t.is_dirty());
            }
        }
        assert_matrix_near(t.world_matrix(), direct_world(&t), 1e-5);
    }

    #[test]
    fn test_inverse_transpose_matches_world() {
        let mut t = Transform::new();
        t.set_position([4.0, -2.0, 1.0]);
        t.set_rotation([0.4, 1.1, -0.7]);
        t.set_scale([2.0, 0.5, 3.0]);

        let world = t.world_matrix();
        let expected = world.invert().unwrap().transpose();
        assert_matrix_near(t.world_inverse_transpose_matrix(), expected, 1e-5);

        // transpose(inv_t) * world == identity
        let product = t.world_inverse_transpose_matrix().transpose() * world;
        assert_matrix_near(product, Matrix4::identity(), 1e-4);
    }

    #[test]
    fn test_zero_scale_falls_back_to_identity_normal_matrix() {
        let mut t = Transform::new();
        t.set_scale([0.0, 1.0, 1.0]);
        assert_matrix_near(t.world_inverse_transpose_matrix(), Matrix4::identity(), 0.0);
    }

    #[test]
    fn test_move_relative_follows_yaw() {
        let mut t = Transform::new();
        t.set_rotation([0.0, FRAC_PI_2, 0.0]);
        t.move_relative([0.0, 0.0, 1.0]);
        // Forward after a quarter turn of yaw points along +X
        assert_vec3_near(t.position(), Vector3::new(1.0, 0.0, 0.0), 1e-6);
        assert_vec3_near(t.forward(), Vector3::new(1.0, 0.0, 0.0), 1e-6);
    }

    #[test]
    fn test_positive_pitch_looks_down() {
        let mut t = Transform::new();
        t.rotate([0.5, 0.0, 0.0]);
        assert!(t.forward().y < 0.0);
    }

    #[test]
    fn test_scale_by_is_multiplicative() {
        let mut t = Transform::new();
        t.set_scale([2.0, 3.0, 4.0]);
        t.scale_by([0.5, 2.0, 1.0]);
        assert_vec3_near(t.scale(), Vector3::new(1.0, 6.0, 4.0), 0.0);
    }
}
