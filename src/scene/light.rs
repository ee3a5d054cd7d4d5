//! Light types for the scene

use glam::{Vec3, Vec4};

use crate::scene::MAX_SCENE_LIGHTS;

/// Value of `g_lightPosType[i].w` for each light kind.
const LIGHT_TYPE_POINT: f32 = 0.0;
const LIGHT_TYPE_DIRECTIONAL: f32 = 1.0;
const LIGHT_TYPE_UNUSED: f32 = 2.0;

/// A light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Point {
        position: Vec3,
        color: Vec3,
        /// Distance at which the light has faded out completely
        range: f32,
    },
    Directional {
        /// Direction towards the light
        direction: Vec3,
        color: Vec3,
    },
}

impl Light {
    pub fn point(position: Vec3, color: Vec3, range: f32) -> Self {
        Light::Point {
            position,
            color,
            range,
        }
    }

    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Light::Directional {
            direction: direction.normalize_or_zero(),
            color,
        }
    }

    /// (position + type, color + range) as laid out in the engine globals.
    pub fn packed(&self) -> (Vec4, Vec4) {
        match *self {
            Light::Point {
                position,
                color,
                range,
            } => (position.extend(LIGHT_TYPE_POINT), color.extend(range)),
            Light::Directional { direction, color } => {
                (direction.extend(LIGHT_TYPE_DIRECTIONAL), color.extend(0.0))
            }
        }
    }
}

/// Light arrays ready for upload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedLights {
    pub pos_type: [Vec4; MAX_SCENE_LIGHTS],
    pub color_range: [Vec4; MAX_SCENE_LIGHTS],
}

/// Ambient light plus an ordered list of lights
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLights {
    pub ambient: Vec3,
    pub lights: Vec<Light>,
}

impl Default for WorldLights {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.2),
            lights: Vec::new(),
        }
    }
}

impl WorldLights {
    pub fn new(ambient: Vec3) -> Self {
        Self {
            ambient,
            lights: Vec::new(),
        }
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.add_light(light);
        self
    }

    /// Lights past `MAX_SCENE_LIGHTS` are kept but not rendered.
    pub fn add_light(&mut self, light: Light) {
        if self.lights.len() == MAX_SCENE_LIGHTS {
            log::debug!("More than {MAX_SCENE_LIGHTS} lights; the extra ones are ignored");
        }
        self.lights.push(light);
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    /// First `MAX_SCENE_LIGHTS` lights in insertion order, padded with unused slots.
    pub fn pack(&self) -> PackedLights {
        let mut packed = PackedLights {
            pos_type: [Vec4::new(0.0, 0.0, 0.0, LIGHT_TYPE_UNUSED); MAX_SCENE_LIGHTS],
            color_range: [Vec4::ZERO; MAX_SCENE_LIGHTS],
        };
        for (i, light) in self.lights.iter().take(MAX_SCENE_LIGHTS).enumerate() {
            (packed.pos_type[i], packed.color_range[i]) = light.packed();
        }
        packed
    }
}
