//! Scene description consumed by render passes: camera and lights

mod camera;
mod light;

pub use camera::*;
pub use light::*;

/// Number of light slots in the engine globals.
pub const MAX_SCENE_LIGHTS: usize = 4;
