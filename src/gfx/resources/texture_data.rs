// src/gfx/resources/texture_data.rs
//! CPU-side RGBA8 images and cubemaps
//!
//! Images are decoded with the `image` crate or generated procedurally, then
//! handed to [`RenderDevice`](crate::gfx::rendering::device::RenderDevice)
//! for upload.

use cgmath::{InnerSpace, Vector3};
use std::path::Path;

use crate::error::AssetError;

#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub pixels: Vec<u8>,
    /// Color data is stored sRGB-encoded; normal and roughness maps are linear
    pub srgb: bool,
}

impl TextureData {
    pub fn from_file(path: impl AsRef<Path>, srgb: bool) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|source| AssetError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        log::debug!("decoded {} ({}x{})", path.display(), width, height);
        Ok(Self {
            width,
            height,
            pixels: img.into_raw(),
            srgb,
        })
    }

    /// A 1x1 texture of one color
    pub fn solid(rgba: [u8; 4], srgb: bool) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
            srgb,
        }
    }

    /// Alternating square cells of two colors
    pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let color = if (x / cell + y / cell) % 2 == 0 { a } else { b };
                pixels.extend_from_slice(&color);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
            srgb: true,
        }
    }

    /// Tangent-space normal map with shallow horizontal grooves every
    /// `period` pixels
    pub fn grooved_normal_map(size: u32, period: u32) -> Self {
        let period = period.max(2);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            let phase = (y % period) as f32 / period as f32 * std::f32::consts::TAU;
            let n = Vector3::new(0.0, phase.sin() * 0.35, 1.0).normalize();
            for _ in 0..size {
                pixels.extend_from_slice(&encode_unit(n));
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
            srgb: false,
        }
    }

    /// Flat tangent-space normal (0, 0, 1)
    pub fn flat_normal_map() -> Self {
        Self::solid([128, 128, 255, 255], false)
    }

    /// Roughness in the red channel, banded between `low` and `high`
    pub fn banded_roughness(size: u32, bands: u32, low: f32, high: f32) -> Self {
        let band = (size / bands.max(1)).max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for _ in 0..size {
            for x in 0..size {
                let r = if (x / band) % 2 == 0 { low } else { high };
                let v = (r.clamp(0.0, 1.0) * 255.0).round() as u8;
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
            srgb: false,
        }
    }
}

fn encode_unit(n: Vector3<f32>) -> [u8; 4] {
    let e = |c: f32| ((c * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
    [e(n.x), e(n.y), e(n.z), 255]
}

/// Six square RGBA8 faces in +X, -X, +Y, -Y, +Z, -Z order
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapData {
    pub size: u32,
    pub faces: [Vec<u8>; 6],
}

impl CubemapData {
    /// File stems read by [`CubemapData::from_dir`], in face order
    pub const FACE_NAMES: [&'static str; 6] = ["right", "left", "up", "down", "front", "back"];

    /// Loads `right.png`, `left.png`, `up.png`, `down.png`, `front.png` and
    /// `back.png` from a directory. All faces must be square and equal.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, AssetError> {
        let dir = dir.as_ref();
        let mut faces: [Vec<u8>; 6] = Default::default();
        let mut size = None;

        for (face, name) in faces.iter_mut().zip(Self::FACE_NAMES) {
            let path = dir.join(format!("{}.png", name));
            let data = TextureData::from_file(&path, true)?;
            let expected = *size.get_or_insert(data.width);
            if data.width != data.height || data.width != expected {
                return Err(AssetError::CubemapFace {
                    path,
                    width: data.width,
                    height: data.height,
                    expected,
                });
            }
            *face = data.pixels;
        }

        Ok(Self {
            size: size.unwrap_or(1),
            faces,
        })
    }

    /// Vertical sky gradient: `zenith` overhead, `horizon` at eye level,
    /// `ground` below
    pub fn gradient(size: u32, zenith: [f32; 3], horizon: [f32; 3], ground: [f32; 3]) -> Self {
        let size = size.max(1);
        let faces = std::array::from_fn(|face| {
            let mut pixels = Vec::with_capacity((size * size * 4) as usize);
            for y in 0..size {
                for x in 0..size {
                    let s = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                    let t = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                    let up = face_direction(face, s, t).normalize().y;
                    let color = if up >= 0.0 {
                        lerp3(horizon, zenith, up.sqrt())
                    } else {
                        lerp3(horizon, ground, (-up).sqrt())
                    };
                    pixels.extend_from_slice(&encode_srgb(color));
                }
            }
            pixels
        });
        Self { size, faces }
    }
}

/// Direction through texel (s, t) in [-1, 1] of a cube face
fn face_direction(face: usize, s: f32, t: f32) -> Vector3<f32> {
    match face {
        0 => Vector3::new(1.0, -t, -s),
        1 => Vector3::new(-1.0, -t, s),
        2 => Vector3::new(s, 1.0, t),
        3 => Vector3::new(s, -1.0, -t),
        4 => Vector3::new(s, -t, 1.0),
        _ => Vector3::new(-s, -t, -1.0),
    }
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

fn encode_srgb(linear: [f32; 3]) -> [u8; 4] {
    let e = |c: f32| {
        let c = c.clamp(0.0, 1.0);
        let s = if c <= 0.003_130_8 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (s * 255.0).round() as u8
    };
    [e(linear[0]), e(linear[1]), e(linear[2]), 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_alternates() {
        let tex = TextureData::checkerboard(4, 2, [255, 0, 0, 255], [0, 0, 255, 255]);
        assert_eq!(tex.pixels.len(), 4 * 4 * 4);
        assert_eq!(&tex.pixels[0..4], &[255, 0, 0, 255]);
        // x = 2 starts the second cell
        assert_eq!(&tex.pixels[8..12], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_gradient_faces_are_oriented() {
        let sky = CubemapData::gradient(8, [0.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]);
        assert!(sky.faces.iter().all(|f| f.len() == 8 * 8 * 4));
        // Straight up is close to the zenith color, straight down close to the ground
        let center = ((4 * 8 + 4) * 4) as usize;
        assert!(sky.faces[2][center] < 40);
        assert_eq!(sky.faces[2][center + 2], 255);
        assert!(sky.faces[3][center + 2] < 40);
        // Side faces keep the zenith's blue at the top and fade toward the ground below
        let bottom_row = (7 * 8 * 4) as usize;
        assert_eq!(sky.faces[4][2], 255);
        assert!(sky.faces[4][bottom_row + 2] < 255);
    }

    #[test]
    fn test_grooved_normals_point_out_of_surface() {
        let map = TextureData::grooved_normal_map(16, 8);
        for px in map.pixels.chunks_exact(4) {
            assert!(px[2] > 200, "z should dominate: {:?}", px);
        }
    }

    #[test]
    fn test_missing_cubemap_dir_is_an_error() {
        let err = CubemapData::from_dir("/no/such/sky").unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }
}
