//! # Primitive Shape Generation
//!
//! Procedural shapes used by the demo scene. Curved surfaces are built as
//! a UV grid over a parametric function, so texture `u` always follows the
//! direction that reads left-to-right when the surface is viewed from
//! outside and `v` runs top-to-bottom.

use super::MeshData;
use cgmath::{InnerSpace, Vector3};
use std::f32::consts::{PI, TAU};

/// Samples `surface(u, v) -> (position, normal)` on a `(columns + 1) x (rows + 1)`
/// grid and stitches the samples into quads.
fn surface_grid<F>(data: &mut MeshData, columns: u32, rows: u32, surface: F)
where
    F: Fn(f32, f32) -> (Vector3<f32>, Vector3<f32>),
{
    let base = data.vertex_count() as u32;
    for row in 0..=rows {
        for column in 0..=columns {
            let u = column as f32 / columns as f32;
            let v = row as f32 / rows as f32;
            let (position, normal) = surface(u, v);
            data.push_vertex(position.into(), normal.normalize().into(), [u, v]);
        }
    }

    let stride = columns + 1;
    for row in 0..rows {
        for column in 0..columns {
            let a = base + row * stride + column;
            data.push_quad(a, a + 1, a + 1 + stride, a + stride);
        }
    }
}

/// Generate a cube with edge length `size` centered at the origin
///
/// Each face has its own four vertices so normals stay flat and every face
/// carries the full 0..1 UV range.
pub fn generate_cube(size: f32) -> MeshData {
    let h = size * 0.5;
    // (normal, u axis, v axis) with v pointing down the face as seen from outside
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut data = MeshData::new();
    for (normal, u_axis, v_axis) in faces {
        let (n, ua, va) = (
            Vector3::from(normal),
            Vector3::from(u_axis),
            Vector3::from(v_axis),
        );
        surface_grid(&mut data, 1, 1, |u, v| {
            let p = n * h + ua * ((u - 0.5) * size) + va * ((v - 0.5) * size);
            (p, n)
        });
    }
    data
}

/// Generate a UV sphere
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `slices` - Segments around the Y axis (min 3)
/// * `stacks` - Segments from pole to pole (min 2)
pub fn generate_sphere(radius: f32, slices: u32, stacks: u32) -> MeshData {
    let slices = slices.max(3);
    let stacks = stacks.max(2);

    let mut data = MeshData::new();
    surface_grid(&mut data, slices, stacks, |u, v| {
        let phi = u * TAU;
        let theta = v * PI;
        let n = Vector3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
        (n * radius, n)
    });
    data
}

/// Generate a capped cylinder along the Y axis
pub fn generate_cylinder(radius: f32, height: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let half = height * 0.5;

    let mut data = MeshData::new();
    surface_grid(&mut data, segments, 1, |u, v| {
        let phi = u * TAU;
        let n = Vector3::new(phi.cos(), 0.0, phi.sin());
        let p = Vector3::new(n.x * radius, half - v * height, n.z * radius);
        (p, n)
    });

    // Caps need their own ring so the normals can point along the axis
    for (y, ny) in [(half, 1.0), (-half, -1.0)] {
        let normal = [0.0, ny, 0.0];
        let center = data.push_vertex([0.0, y, 0.0], normal, [0.5, 0.5]);
        let first = data.vertex_count() as u32;
        for i in 0..segments {
            let phi = i as f32 / segments as f32 * TAU;
            let (s, c) = phi.sin_cos();
            data.push_vertex(
                [c * radius, y, s * radius],
                normal,
                [0.5 + c * 0.5, 0.5 - s * ny * 0.5],
            );
        }
        for i in 0..segments {
            let current = first + i;
            let next = first + (i + 1) % segments;
            data.push_triangle_facing(center, current, next);
        }
    }
    data
}

/// Generate a torus around the Y axis
///
/// # Arguments
/// * `major_radius` - Distance from the center to the middle of the tube
/// * `minor_radius` - Tube radius
/// * `rings` - Segments around the Y axis
/// * `sides` - Segments around the tube
pub fn generate_torus(major_radius: f32, minor_radius: f32, rings: u32, sides: u32) -> MeshData {
    let rings = rings.max(3);
    let sides = sides.max(3);

    let mut data = MeshData::new();
    surface_grid(&mut data, rings, sides, |u, v| {
        let theta = u * TAU;
        let phi = v * TAU;
        let radial = Vector3::new(theta.cos(), 0.0, theta.sin());
        let n = radial * phi.cos() - Vector3::unit_y() * phi.sin();
        (radial * major_radius + n * minor_radius, n)
    });
    data
}

/// Generate an open tube swept along a helix around the Y axis
///
/// # Arguments
/// * `coil_radius` - Radius of the helix path
/// * `tube_radius` - Radius of the swept tube
/// * `turns` - Number of full revolutions
/// * `height` - Total rise, centered on the origin
/// * `segments_per_turn` - Path segments per revolution
/// * `sides` - Segments around the tube
pub fn generate_helix(
    coil_radius: f32,
    tube_radius: f32,
    turns: f32,
    height: f32,
    segments_per_turn: u32,
    sides: u32,
) -> MeshData {
    let segments = ((segments_per_turn.max(3) as f32) * turns).ceil().max(1.0) as u32;
    let sides = sides.max(3);
    let sweep = turns * TAU;
    let rise = height / sweep;

    let mut data = MeshData::new();
    surface_grid(&mut data, segments, sides, |u, v| {
        let t = u * sweep;
        let (s, c) = t.sin_cos();
        let center = Vector3::new(coil_radius * c, rise * t - height * 0.5, coil_radius * s);
        let along = Vector3::new(-coil_radius * s, rise, coil_radius * c).normalize();
        let outward = Vector3::new(c, 0.0, s);
        let binormal = along.cross(outward).normalize();

        let phi = v * TAU;
        let n = outward * phi.cos() + binormal * phi.sin();
        (center + n * tube_radius, n)
    });
    data
}

/// Generate a flat plane on XZ facing +Y
///
/// # Arguments
/// * `width` - Extent along X
/// * `depth` - Extent along Z
/// * `columns`, `rows` - Subdivisions along X and Z
pub fn generate_plane(width: f32, depth: f32, columns: u32, rows: u32) -> MeshData {
    let mut data = MeshData::new();
    surface_grid(&mut data, columns.max(1), rows.max(1), |u, v| {
        let p = Vector3::new((u - 0.5) * width, 0.0, (0.5 - v) * depth);
        (p, Vector3::unit_y())
    });
    data
}

/// Cube used by the sky box; the sky pipeline culls front faces so the
/// inside is what gets drawn
pub fn generate_sky_cube() -> MeshData {
    generate_cube(2.0)
}
