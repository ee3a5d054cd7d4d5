//! Attribute and uniform reflection over validated naga modules.
//!
//! Uniform block members are flattened into individual uniforms that carry
//! their std140 offset. Sampled images become texture uniforms; a sampler
//! named `<texture>_sampler` is paired with its texture.

use std::collections::HashMap;

use naga::{AddressSpace, ArraySize, Binding, ImageDimension, Module, ScalarKind, TypeInner, VectorSize};

use crate::backend::{AttributeLayout, BlockLayout, TextureLayout, VertexFormat};
use crate::shader::UniformType;

/// Base type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Invalid,
}

impl AttributeType {
    /// Vertex format feeding this attribute, if it can be fed at all.
    pub fn vertex_format(&self) -> Option<VertexFormat> {
        Some(match self {
            AttributeType::Float => VertexFormat::Float32,
            AttributeType::Vec2 => VertexFormat::Float32x2,
            AttributeType::Vec3 => VertexFormat::Float32x3,
            AttributeType::Vec4 => VertexFormat::Float32x4,
            AttributeType::Int => VertexFormat::Sint32,
            AttributeType::IVec2 => VertexFormat::Sint32x2,
            AttributeType::IVec3 => VertexFormat::Sint32x3,
            AttributeType::IVec4 => VertexFormat::Sint32x4,
            AttributeType::Invalid => return None,
        })
    }

    pub fn glsl_name(&self) -> &'static str {
        match self {
            AttributeType::Float => "float",
            AttributeType::Vec2 => "vec2",
            AttributeType::Vec3 => "vec3",
            AttributeType::Vec4 => "vec4",
            AttributeType::Int => "int",
            AttributeType::IVec2 => "ivec2",
            AttributeType::IVec3 => "ivec3",
            AttributeType::IVec4 => "ivec4",
            AttributeType::Invalid => "unsupported",
        }
    }
}

/// Where the value of a uniform lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformLocation {
    Block {
        group: u32,
        binding: u32,
        offset: u32,
        stride: u32,
    },
    Texture {
        group: u32,
        binding: u32,
        sampler_binding: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub ty: AttributeType,
    pub array_size: u32,
    pub location: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub ty: UniformType,
    pub array_size: u32,
    pub location: UniformLocation,
}

impl UniformInfo {
    /// Engine globals are bound by the render pass, never by materials.
    pub fn is_engine_global(&self) -> bool {
        self.name.starts_with(ENGINE_GLOBAL_PREFIX)
    }

    pub fn texture_layout(&self) -> Option<TextureLayout> {
        match self.location {
            UniformLocation::Texture {
                group,
                binding,
                sampler_binding,
            } => Some(TextureLayout {
                group,
                binding,
                sampler_binding,
                cubemap: self.ty == UniformType::TextureCube,
            }),
            UniformLocation::Block { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockInfo {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub size: u32,
}

/// Name prefix of uniforms owned by the render pass.
pub const ENGINE_GLOBAL_PREFIX: &str = "g_";

/// Reflected interface of a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    attributes: Vec<AttributeInfo>,
    uniforms: Vec<UniformInfo>,
    blocks: Vec<UniformBlockInfo>,
}

impl ShaderReflection {
    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.uniforms
    }

    pub fn blocks(&self) -> &[UniformBlockInfo] {
        &self.blocks
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    pub fn block_index(&self, group: u32, binding: u32) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| b.group == group && b.binding == binding)
    }

    /// Uniforms a material may set, in declaration order.
    pub fn material_uniforms(&self) -> impl Iterator<Item = &UniformInfo> {
        self.uniforms.iter().filter(|u| !u.is_engine_global())
    }

    pub(crate) fn block_layouts(&self) -> Vec<BlockLayout> {
        self.blocks
            .iter()
            .map(|b| BlockLayout {
                group: b.group,
                binding: b.binding,
                size: b.size,
            })
            .collect()
    }

    pub(crate) fn texture_layouts(&self) -> Vec<TextureLayout> {
        self.uniforms
            .iter()
            .filter_map(UniformInfo::texture_layout)
            .collect()
    }

    pub(crate) fn attribute_layouts(&self) -> Vec<AttributeLayout> {
        self.attributes
            .iter()
            .filter_map(|a| {
                Some(AttributeLayout {
                    location: a.location,
                    format: a.ty.vertex_format()?,
                })
            })
            .collect()
    }

    /// Merge the reflection of another stage into this one.
    ///
    /// Uniforms shared between stages must agree on type and location.
    pub(crate) fn merge(&mut self, other: ShaderReflection) -> Result<(), String> {
        for uniform in other.uniforms {
            match self.uniform(&uniform.name) {
                Some(existing) if *existing != uniform => {
                    return Err(format!(
                        "uniform '{}' is declared differently across stages",
                        uniform.name
                    ));
                }
                Some(_) => {}
                None => self.uniforms.push(uniform),
            }
        }
        for block in other.blocks {
            match self.block_index(block.group, block.binding) {
                Some(index) if self.blocks[index].size != block.size => {
                    return Err(format!(
                        "uniform block at binding {} has different sizes across stages",
                        block.binding
                    ));
                }
                Some(_) => {}
                None => self.blocks.push(block),
            }
        }
        self.attributes.extend(other.attributes);
        Ok(())
    }
}

/// Reflect a single-stage module.
pub fn reflect_module(module: &Module, stage: naga::ShaderStage) -> ShaderReflection {
    let mut reflection = ShaderReflection::default();

    // Sampler bindings by name, for pairing with textures
    let samplers: HashMap<&str, u32> = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            match module.types[var.ty].inner {
                TypeInner::Sampler { .. } => Some((var.name.as_deref()?, binding.binding)),
                _ => None,
            }
        })
        .collect();

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let var_name = var.name.clone().unwrap_or_default();
        let ty = &module.types[var.ty];

        match (var.space, &ty.inner) {
            (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                reflection.blocks.push(UniformBlockInfo {
                    name: ty.name.clone().unwrap_or_else(|| var_name.clone()),
                    group: binding.group,
                    binding: binding.binding,
                    size: *span,
                });
                for member in members {
                    let (ty, array_size, stride) = uniform_type(module, member.ty);
                    reflection.uniforms.push(UniformInfo {
                        name: member.name.clone().unwrap_or_default(),
                        ty,
                        array_size,
                        location: UniformLocation::Block {
                            group: binding.group,
                            binding: binding.binding,
                            offset: member.offset,
                            stride,
                        },
                    });
                }
            }
            (AddressSpace::Uniform, inner) => {
                let (ty, array_size, stride) = uniform_type(module, var.ty);
                reflection.blocks.push(UniformBlockInfo {
                    name: var_name.clone(),
                    group: binding.group,
                    binding: binding.binding,
                    size: inner.size(module.to_ctx()),
                });
                reflection.uniforms.push(UniformInfo {
                    name: var_name,
                    ty,
                    array_size,
                    location: UniformLocation::Block {
                        group: binding.group,
                        binding: binding.binding,
                        offset: 0,
                        stride,
                    },
                });
            }
            (AddressSpace::Handle, TypeInner::Image { dim, arrayed, .. }) => {
                let ty = match (dim, arrayed) {
                    (ImageDimension::D2, false) => UniformType::Texture,
                    (ImageDimension::Cube, false) => UniformType::TextureCube,
                    _ => UniformType::Invalid,
                };
                let sampler_binding = samplers
                    .get(format!("{var_name}_sampler").as_str())
                    .copied();
                reflection.uniforms.push(UniformInfo {
                    name: var_name,
                    ty,
                    array_size: 1,
                    location: UniformLocation::Texture {
                        group: binding.group,
                        binding: binding.binding,
                        sampler_binding,
                    },
                });
            }
            _ => {}
        }
    }

    if stage == naga::ShaderStage::Vertex {
        for entry_point in module.entry_points.iter().filter(|ep| ep.stage == stage) {
            for argument in &entry_point.function.arguments {
                match (&argument.binding, &module.types[argument.ty].inner) {
                    (Some(Binding::Location { location, .. }), inner) => {
                        reflection.attributes.push(AttributeInfo {
                            name: argument.name.clone().unwrap_or_default(),
                            ty: attribute_type(inner),
                            array_size: 1,
                            location: *location,
                        });
                    }
                    (None, TypeInner::Struct { members, .. }) => {
                        for member in members {
                            if let Some(Binding::Location { location, .. }) = &member.binding {
                                reflection.attributes.push(AttributeInfo {
                                    name: member.name.clone().unwrap_or_default(),
                                    ty: attribute_type(&module.types[member.ty].inner),
                                    array_size: 1,
                                    location: *location,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        reflection.attributes.sort_by_key(|a| a.location);
    }

    reflection
}

/// Map a uniform type to (semantic type, array size, array stride).
fn uniform_type(module: &Module, ty: naga::Handle<naga::Type>) -> (UniformType, u32, u32) {
    match &module.types[ty].inner {
        TypeInner::Array { base, size, stride } => {
            let count = match size {
                ArraySize::Constant(n) => n.get(),
                _ => 1,
            };
            let element = scalar_uniform_type(&module.types[*base].inner);
            if element.supports_arrays() {
                (element, count, *stride)
            } else {
                (UniformType::Invalid, count, *stride)
            }
        }
        inner => (scalar_uniform_type(inner), 1, 0),
    }
}

fn scalar_uniform_type(inner: &TypeInner) -> UniformType {
    match inner {
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Float => UniformType::Float,
            ScalarKind::Sint | ScalarKind::Uint => UniformType::Int,
            _ => UniformType::Invalid,
        },
        TypeInner::Vector { size, scalar } => match (size, scalar.kind) {
            (VectorSize::Bi, ScalarKind::Float) => UniformType::Vec2,
            (VectorSize::Tri, ScalarKind::Float) => UniformType::Vec3,
            (VectorSize::Quad, ScalarKind::Float) => UniformType::Vec4,
            (VectorSize::Quad, ScalarKind::Sint) => UniformType::IVec4,
            _ => UniformType::Invalid,
        },
        TypeInner::Matrix { columns, rows, .. } => match (columns, rows) {
            (VectorSize::Tri, VectorSize::Tri) => UniformType::Mat3,
            (VectorSize::Quad, VectorSize::Quad) => UniformType::Mat4,
            _ => UniformType::Invalid,
        },
        _ => UniformType::Invalid,
    }
}

fn attribute_type(inner: &TypeInner) -> AttributeType {
    match inner {
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Float => AttributeType::Float,
            ScalarKind::Sint => AttributeType::Int,
            _ => AttributeType::Invalid,
        },
        TypeInner::Vector { size, scalar } => match (scalar.kind, size) {
            (ScalarKind::Float, VectorSize::Bi) => AttributeType::Vec2,
            (ScalarKind::Float, VectorSize::Tri) => AttributeType::Vec3,
            (ScalarKind::Float, VectorSize::Quad) => AttributeType::Vec4,
            (ScalarKind::Sint, VectorSize::Bi) => AttributeType::IVec2,
            (ScalarKind::Sint, VectorSize::Tri) => AttributeType::IVec3,
            (ScalarKind::Sint, VectorSize::Quad) => AttributeType::IVec4,
            _ => AttributeType::Invalid,
        },
        _ => AttributeType::Invalid,
    }
}
