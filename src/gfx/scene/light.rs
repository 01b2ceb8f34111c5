// src/gfx/scene/light.rs
//! Scene lights and their shader layout

use cgmath::{InnerSpace, Vector3};

/// Largest number of lights the entity pixel shader iterates over
pub const MAX_LIGHTS: usize = 8;

/// Light variant. Only the fields a variant carries are meaningful to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional {
        direction: Vector3<f32>,
    },
    Point {
        position: Vector3<f32>,
        range: f32,
    },
    Spot {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        range: f32,
        /// Exponent applied to the cone term; larger is narrower
        falloff: f32,
    },
}

impl LightKind {
    /// Type tag read by the pixel shader
    pub fn tag(&self) -> i32 {
        match self {
            LightKind::Directional { .. } => 0,
            LightKind::Point { .. } => 1,
            LightKind::Spot { .. } => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LightKind::Directional { .. } => "Directional",
            LightKind::Point { .. } => "Point",
            LightKind::Spot { .. } => "Spot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl Light {
    pub fn directional(direction: impl Into<Vector3<f32>>, color: impl Into<Vector3<f32>>, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional {
                direction: direction.into(),
            },
            color: color.into(),
            intensity,
        }
    }

    pub fn point(position: impl Into<Vector3<f32>>, range: f32, color: impl Into<Vector3<f32>>, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point {
                position: position.into(),
                range,
            },
            color: color.into(),
            intensity,
        }
    }

    pub fn spot(
        position: impl Into<Vector3<f32>>,
        direction: impl Into<Vector3<f32>>,
        range: f32,
        falloff: f32,
        color: impl Into<Vector3<f32>>,
        intensity: f32,
    ) -> Self {
        Self {
            kind: LightKind::Spot {
                position: position.into(),
                direction: direction.into(),
                range,
                falloff,
            },
            color: color.into(),
            intensity,
        }
    }

    /// Normalized direction for directional and spot lights
    pub fn direction(&self) -> Option<Vector3<f32>> {
        match self.kind {
            LightKind::Directional { direction } | LightKind::Spot { direction, .. } => {
                Some(normalize_or_down(direction))
            }
            LightKind::Point { .. } => None,
        }
    }

    pub fn position(&self) -> Option<Vector3<f32>> {
        match self.kind {
            LightKind::Point { position, .. } | LightKind::Spot { position, .. } => Some(position),
            LightKind::Directional { .. } => None,
        }
    }

    /// Moves a point or spot light. Returns false for directional lights.
    pub fn set_position(&mut self, new_position: impl Into<Vector3<f32>>) -> bool {
        match &mut self.kind {
            LightKind::Point { position, .. } | LightKind::Spot { position, .. } => {
                *position = new_position.into();
                true
            }
            LightKind::Directional { .. } => false,
        }
    }

    /// Re-aims a directional or spot light. Returns false for point lights.
    pub fn set_direction(&mut self, new_direction: impl Into<Vector3<f32>>) -> bool {
        match &mut self.kind {
            LightKind::Directional { direction } | LightKind::Spot { direction, .. } => {
                *direction = new_direction.into();
                true
            }
            LightKind::Point { .. } => false,
        }
    }

    pub fn to_uniform(&self) -> LightUniform {
        let mut uniform = LightUniform {
            kind: self.kind.tag(),
            color: self.color.into(),
            intensity: self.intensity,
            ..Default::default()
        };
        match self.kind {
            LightKind::Directional { direction } => {
                uniform.direction = normalize_or_down(direction).into();
            }
            LightKind::Point { position, range } => {
                uniform.position = position.into();
                uniform.range = range;
            }
            LightKind::Spot {
                position,
                direction,
                range,
                falloff,
            } => {
                uniform.position = position.into();
                uniform.direction = normalize_or_down(direction).into();
                uniform.range = range;
                uniform.spot_falloff = falloff;
            }
        }
        uniform
    }
}

fn normalize_or_down(v: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() > f32::EPSILON {
        v.normalize()
    } else {
        -Vector3::unit_y()
    }
}

/// One element of the `lights` array in the entity pixel shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub direction: [f32; 3],
    pub kind: i32,
    pub position: [f32; 3],
    pub range: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub spot_falloff: f32,
    pub _padding: [f32; 3],
}

/// Packs up to [`MAX_LIGHTS`] lights into a fixed-size array and reports how
/// many are live
pub fn pack_lights(lights: &[Light]) -> ([LightUniform; MAX_LIGHTS], u32) {
    let mut packed = [LightUniform::default(); MAX_LIGHTS];
    if lights.len() > MAX_LIGHTS {
        log::warn!(
            "{} lights in scene, only the first {} are shaded",
            lights.len(),
            MAX_LIGHTS
        );
    }
    let count = lights.len().min(MAX_LIGHTS);
    for (slot, light) in packed.iter_mut().zip(lights) {
        *slot = light.to_uniform();
    }
    (packed, count as u32)
}
