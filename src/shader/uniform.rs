//! Uniform types, values and std140 packing.

use std::sync::Arc;

use glam::{IVec4, Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::resources::Texture;

/// Semantic type of a reflected uniform.
///
/// `Invalid` marks uniforms the program declares but materials cannot set
/// (booleans, structs, arrays of unsupported element types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    IVec4,
    Mat3,
    Mat4,
    Texture,
    TextureCube,
    Invalid,
}

impl UniformType {
    pub fn is_texture(&self) -> bool {
        matches!(self, UniformType::Texture | UniformType::TextureCube)
    }

    /// Whether arrays of this type can be set on a material.
    pub fn supports_arrays(&self) -> bool {
        matches!(self, UniformType::Float | UniformType::Vec4 | UniformType::Mat4)
    }

    /// GLSL spelling, used by the inspector.
    pub fn glsl_name(&self) -> &'static str {
        match self {
            UniformType::Float => "float",
            UniformType::Int => "int",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
            UniformType::IVec4 => "ivec4",
            UniformType::Mat3 => "mat3",
            UniformType::Mat4 => "mat4",
            UniformType::Texture => "texture2D",
            UniformType::TextureCube => "textureCube",
            UniformType::Invalid => "unsupported",
        }
    }
}

/// Value stored in a material slot or bound as an engine global.
#[derive(Debug, Clone)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IVec4(IVec4),
    Mat3(Mat3),
    Mat4(Mat4),
    FloatArray(Vec<f32>),
    Vec4Array(Vec<Vec4>),
    Mat4Array(Vec<Mat4>),
    Texture {
        texture: Option<Arc<Texture>>,
        slot: u32,
    },
}

impl UniformValue {
    /// Zero value for a reflected uniform. Returns `None` for `Invalid`.
    pub fn zeroed(ty: UniformType, array_size: u32, texture_slot: u32) -> Option<Self> {
        let count = array_size.max(1) as usize;
        let value = match (ty, array_size > 1) {
            (UniformType::Float, true) => UniformValue::FloatArray(vec![0.0; count]),
            (UniformType::Vec4, true) => UniformValue::Vec4Array(vec![Vec4::ZERO; count]),
            (UniformType::Mat4, true) => UniformValue::Mat4Array(vec![Mat4::ZERO; count]),
            (_, true) => return None,
            (UniformType::Float, false) => UniformValue::Float(0.0),
            (UniformType::Int, false) => UniformValue::Int(0),
            (UniformType::Vec2, false) => UniformValue::Vec2(Vec2::ZERO),
            (UniformType::Vec3, false) => UniformValue::Vec3(Vec3::ZERO),
            (UniformType::Vec4, false) => UniformValue::Vec4(Vec4::ZERO),
            (UniformType::IVec4, false) => UniformValue::IVec4(IVec4::ZERO),
            (UniformType::Mat3, false) => UniformValue::Mat3(Mat3::ZERO),
            (UniformType::Mat4, false) => UniformValue::Mat4(Mat4::ZERO),
            (UniformType::Texture | UniformType::TextureCube, false) => UniformValue::Texture {
                texture: None,
                slot: texture_slot,
            },
            (UniformType::Invalid, false) => return None,
        };
        Some(value)
    }

    /// Element type of the value.
    ///
    /// An unbound texture reports `Texture`; callers accept it for cube slots too.
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Float(_) | UniformValue::FloatArray(_) => UniformType::Float,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) | UniformValue::Vec4Array(_) => UniformType::Vec4,
            UniformValue::IVec4(_) => UniformType::IVec4,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) | UniformValue::Mat4Array(_) => UniformType::Mat4,
            UniformValue::Texture { texture, .. } => match texture {
                Some(texture) if texture.is_cubemap() => UniformType::TextureCube,
                _ => UniformType::Texture,
            },
        }
    }

    /// Number of elements, 1 for non-array values.
    pub fn element_count(&self) -> u32 {
        match self {
            UniformValue::FloatArray(v) => v.len() as u32,
            UniformValue::Vec4Array(v) => v.len() as u32,
            UniformValue::Mat4Array(v) => v.len() as u32,
            _ => 1,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            UniformValue::FloatArray(_) | UniformValue::Vec4Array(_) | UniformValue::Mat4Array(_)
        )
    }

    /// Write the value with std140 layout at `offset`, elements `stride` bytes apart.
    ///
    /// Elements that would not fit in `buffer` are dropped. Textures write nothing.
    pub fn write_std140(&self, buffer: &mut [u8], offset: usize, stride: usize) {
        match self {
            UniformValue::Float(v) => put(buffer, offset, bytemuck::bytes_of(v)),
            UniformValue::Int(v) => put(buffer, offset, bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => put(buffer, offset, bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => put(buffer, offset, bytemuck::bytes_of(v)),
            UniformValue::Vec4(v) => put(buffer, offset, bytemuck::bytes_of(v)),
            UniformValue::IVec4(v) => put(buffer, offset, bytemuck::bytes_of(v)),
            UniformValue::Mat3(m) => {
                // Each column is padded to a vec4
                for (i, column) in [m.x_axis, m.y_axis, m.z_axis].iter().enumerate() {
                    put(buffer, offset + i * 16, bytemuck::bytes_of(column));
                }
            }
            UniformValue::Mat4(m) => put(buffer, offset, bytemuck::bytes_of(m)),
            UniformValue::FloatArray(values) => {
                for (i, v) in values.iter().enumerate() {
                    put(buffer, offset + i * stride, bytemuck::bytes_of(v));
                }
            }
            UniformValue::Vec4Array(values) => {
                for (i, v) in values.iter().enumerate() {
                    put(buffer, offset + i * stride, bytemuck::bytes_of(v));
                }
            }
            UniformValue::Mat4Array(values) => {
                for (i, v) in values.iter().enumerate() {
                    put(buffer, offset + i * stride, bytemuck::bytes_of(v));
                }
            }
            UniformValue::Texture { .. } => {}
        }
    }
}

fn put(buffer: &mut [u8], offset: usize, bytes: &[u8]) {
    if let Some(dst) = buffer.get_mut(offset..offset + bytes.len()) {
        dst.copy_from_slice(bytes);
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(v: $ty) -> Self {
                    UniformValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    f32 => Float,
    i32 => Int,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    IVec4 => IVec4,
    Mat3 => Mat3,
    Mat4 => Mat4,
    Vec<f32> => FloatArray,
    Vec<Vec4> => Vec4Array,
    Vec<Mat4> => Mat4Array,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_zeroed_values() {
        assert!(matches!(
            UniformValue::zeroed(UniformType::Vec4, 1, 0),
            Some(UniformValue::Vec4(v)) if v == Vec4::ZERO
        ));
        assert!(matches!(
            UniformValue::zeroed(UniformType::Float, 3, 0),
            Some(UniformValue::FloatArray(v)) if v.len() == 3
        ));
        assert!(UniformValue::zeroed(UniformType::Vec3, 2, 0).is_none());
        assert!(UniformValue::zeroed(UniformType::Invalid, 1, 0).is_none());
    }

    #[test]
    fn test_std140_float_array_uses_stride() {
        let mut buffer = vec![0u8; 48];
        UniformValue::FloatArray(vec![1.0, 2.0, 3.0]).write_std140(&mut buffer, 0, 16);
        let floats = floats(&buffer);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[4], 2.0);
        assert_eq!(floats[8], 3.0);
        assert_eq!(floats[1], 0.0);
    }

    #[test]
    fn test_std140_mat3_pads_columns() {
        let mut buffer = vec![0u8; 48];
        UniformValue::Mat3(Mat3::IDENTITY).write_std140(&mut buffer, 0, 0);
        let floats = floats(&buffer);
        assert_eq!(&floats[0..4], &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(&floats[4..8], &[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(&floats[8..12], &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_write_out_of_bounds_is_dropped() {
        let mut buffer = vec![0u8; 8];
        UniformValue::Vec4(Vec4::ONE).write_std140(&mut buffer, 0, 0);
        assert_eq!(buffer, vec![0u8; 8]);
    }
}
