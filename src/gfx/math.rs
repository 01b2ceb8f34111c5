// src/gfx/math.rs
//! Left-handed matrix helpers
//!
//! The renderer works in a left-handed space (+X right, +Y up, +Z into the
//! screen) with a [0, 1] depth range, which is what wgpu expects, so the
//! projection matrices below need no extra clip-space correction.
//!
//! Matrices are stored column-major (cgmath convention) and applied as
//! `projection * view * world * v`.

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};

/// Builds a view matrix looking from `eye` along `direction`
pub fn look_to_lh(eye: Vector3<f32>, direction: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    let z = direction.normalize();
    let x = up.cross(z).normalize();
    let y = z.cross(x);

    Matrix4::from_cols(
        Vector4::new(x.x, y.x, z.x, 0.0),
        Vector4::new(x.y, y.y, z.y, 0.0),
        Vector4::new(x.z, y.z, z.z, 0.0),
        Vector4::new(-x.dot(eye), -y.dot(eye), -z.dot(eye), 1.0),
    )
}

/// Perspective projection from a vertical field of view in radians
pub fn perspective_lh(fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Matrix4<f32> {
    let h = 1.0 / (fov_y * 0.5).tan();
    let w = h / aspect_ratio;
    let range = far / (far - near);

    Matrix4::from_cols(
        Vector4::new(w, 0.0, 0.0, 0.0),
        Vector4::new(0.0, h, 0.0, 0.0),
        Vector4::new(0.0, 0.0, range, 1.0),
        Vector4::new(0.0, 0.0, -range * near, 0.0),
    )
}

/// Orthographic projection of a `width` x `height` volume centered on the view axis
pub fn orthographic_lh(width: f32, height: f32, near: f32, far: f32) -> Matrix4<f32> {
    let range = 1.0 / (far - near);

    Matrix4::from_cols(
        Vector4::new(2.0 / width, 0.0, 0.0, 0.0),
        Vector4::new(0.0, 2.0 / height, 0.0, 0.0),
        Vector4::new(0.0, 0.0, range, 0.0),
        Vector4::new(0.0, 0.0, -range * near, 1.0),
    )
}

/// Column-major array form used for shader uploads
pub fn to_array(matrix: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix.into()
}

#[cfg(test)]
pub(crate) mod test_util {
    use cgmath::{Matrix4, Vector3};

    pub fn assert_matrix_near(a: Matrix4<f32>, b: Matrix4<f32>, eps: f32) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for c in 0..4 {
            for r in 0..4 {
                assert!(
                    (a[c][r] - b[c][r]).abs() <= eps,
                    "matrices differ at column {} row {}: {:?} vs {:?}",
                    c,
                    r,
                    a,
                    b
                );
            }
        }
    }

    pub fn assert_vec3_near(a: Vector3<f32>, b: Vector3<f32>, eps: f32) {
        assert!(
            (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps && (a.z - b.z).abs() <= eps,
            "{:?} vs {:?}",
            a,
            b
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, Transform as _};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_look_to_puts_target_on_positive_z() {
        let view = look_to_lh(
            Vector3::new(0.0, 0.0, -5.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::unit_y(),
        );
        let p = view.transform_point(Point3::new(0.0, 0.0, 0.0));
        assert!((p.z - 5.0).abs() < 1e-5);

        // +X stays on the right in a left-handed view
        let right = view.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!(right.x > 0.0);
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let proj = perspective_lh(FRAC_PI_2, 16.0 / 9.0, 0.1, 100.0);
        let near = proj * Vector4::new(0.0, 0.0, 0.1, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, 100.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_orthographic_maps_volume_to_clip_box() {
        let proj = orthographic_lh(20.0, 10.0, 1.0, 101.0);
        let corner = proj * Vector4::new(10.0, 5.0, 101.0, 1.0);
        assert!((corner.x - 1.0).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);
        assert!((corner.z - 1.0).abs() < 1e-6);
        assert_eq!(corner.w, 1.0);
    }
}
