//! Materials: typed parameter sets bound to one shader

use std::fmt;
use std::sync::Arc;

use crate::error::BindError;
use crate::resources::next_resource_id;
use crate::resources::Texture;
use crate::shader::{Shader, ShaderReflection, UniformInfo, UniformType, UniformValue};

#[derive(Debug, Clone)]
struct MaterialParam {
    name: String,
    ty: UniformType,
    array_size: u32,
    value: UniformValue,
}

impl MaterialParam {
    fn matches(&self, info: &UniformInfo) -> bool {
        self.name == info.name && self.ty == info.ty && self.array_size == info.array_size
    }
}

/// Zeroed parameters for the reflected material uniforms, carrying over
/// `previous` values whose name, type and array size are unchanged.
fn build_params(reflection: &ShaderReflection, previous: &[MaterialParam]) -> Vec<MaterialParam> {
    let mut texture_slot = 0;
    reflection
        .material_uniforms()
        .filter_map(|info| {
            let zeroed = UniformValue::zeroed(info.ty, info.array_size, texture_slot)?;
            if info.ty.is_texture() {
                texture_slot += 1;
            }
            let value = previous
                .iter()
                .find(|p| p.matches(info))
                .map_or(zeroed, |p| p.value.clone());
            Some(MaterialParam {
                name: info.name.clone(),
                ty: info.ty,
                array_size: info.array_size,
                value,
            })
        })
        .collect()
}

/// Named uniform values for one shader.
///
/// Parameters are created zeroed from the shader's reflected material
/// uniforms (everything except `g_` engine globals and unsupported types), in
/// declaration order. Texture parameters start with slot = their index among
/// the texture uniforms.
///
/// A recompile of the shader can change its uniforms. Readers only see
/// parameters the current program still declares; `set` and [`refresh`]
/// rebuild the set, keeping values whose name, type and array size survived.
///
/// [`refresh`]: Material::refresh
pub struct Material {
    id: u64,
    name: String,
    shader: Arc<Shader>,
    /// Shader generation `params` was built from
    generation: u64,
    params: Vec<MaterialParam>,
}

impl Material {
    pub fn new(shader: Arc<Shader>) -> Self {
        let (_, reflection, generation) = shader.linked();
        let params = build_params(&reflection, &[]);

        Self {
            id: next_resource_id(),
            name: shader.name().to_string(),
            shader,
            generation,
            params,
        }
    }

    /// Rebuild parameters after the shader was recompiled. Returns whether
    /// anything was rebuilt.
    pub fn refresh(&mut self) -> bool {
        let (_, reflection, generation) = self.shader.linked();
        if generation == self.generation {
            return false;
        }
        self.params = build_params(&reflection, &self.params);
        self.generation = generation;
        log::debug!(
            "Material '{}': rebuilt {} parameters for shader generation {generation}",
            self.name,
            self.params.len()
        );
        true
    }

    /// Reflection to filter against when the shader moved past `params`.
    fn stale_reflection(&self) -> Option<Arc<ShaderReflection>> {
        let (_, reflection, generation) = self.shader.linked();
        (generation != self.generation).then_some(reflection)
    }

    /// Identity used for state-change counting. Clones get a fresh id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn uniform_count(&self) -> usize {
        self.iter().count()
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        let param = self.param(name)?;
        match self.stale_reflection() {
            Some(reflection) if !reflection.material_uniforms().any(|u| param.matches(u)) => None,
            _ => Some(&param.value),
        }
    }

    /// Parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        let stale = self.stale_reflection();
        self.params
            .iter()
            .filter(move |p| {
                stale
                    .as_ref()
                    .map_or(true, |reflection| reflection.material_uniforms().any(|u| p.matches(u)))
            })
            .map(|p| (p.name.as_str(), &p.value))
    }

    /// Set a parameter against the shader's current uniforms. On error the
    /// values are unchanged.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<(), BindError> {
        self.refresh();
        let result = self.try_set(name, value.into());
        if let Err(err) = &result {
            log::warn!("Material '{}': {err}", self.name);
        }
        result
    }

    fn try_set(&mut self, name: &str, value: UniformValue) -> Result<(), BindError> {
        let index = self
            .params
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| BindError::UnknownUniform(name.to_string()))?;
        let param = &self.params[index];

        let found = value.uniform_type();
        let type_matches = match (param.ty, &value) {
            (UniformType::TextureCube, UniformValue::Texture { texture: None, .. }) => true,
            (expected, _) => expected == found,
        };
        if !type_matches {
            return Err(BindError::TypeMismatch {
                name: name.to_string(),
                expected: param.ty,
                found,
            });
        }

        let expects_array = param.array_size > 1;
        if value.is_array() != expects_array
            || (expects_array && value.element_count() != param.array_size)
        {
            return Err(BindError::ArrayLength {
                name: name.to_string(),
                expected: param.array_size.max(1),
                found: value.element_count(),
            });
        }

        if let UniformValue::Texture {
            texture: Some(_),
            slot,
        } = &value
        {
            let collision = self.params.iter().enumerate().find(|(i, other)| {
                *i != index
                    && matches!(
                        &other.value,
                        UniformValue::Texture { texture: Some(_), slot: s } if s == slot
                    )
            });
            if let Some((_, other)) = collision {
                return Err(BindError::TextureSlotCollision {
                    name: name.to_string(),
                    other: other.name.clone(),
                    slot: *slot,
                });
            }
        }

        log::trace!("Material '{}': set '{name}'", self.name);
        self.params[index].value = value;
        Ok(())
    }

    /// Bind (or unbind with `None`) a texture at an explicit slot.
    pub fn set_texture(
        &mut self,
        name: &str,
        texture: Option<Arc<Texture>>,
        slot: u32,
    ) -> Result<(), BindError> {
        self.set(name, UniformValue::Texture { texture, slot })
    }

    /// Texture bound to `name`, if any.
    pub fn texture(&self, name: &str) -> Option<&Arc<Texture>> {
        match self.get(name) {
            Some(UniformValue::Texture { texture, .. }) => texture.as_ref(),
            _ => None,
        }
    }

    /// Value to bind for a reflected uniform of the shader's current program.
    ///
    /// Returns `None` when the parameter is missing or its type no longer
    /// matches, which happens after a recompile changed the interface.
    pub(crate) fn value_for(&self, info: &UniformInfo) -> Option<&UniformValue> {
        let param = self.param(&info.name)?;
        param.matches(info).then_some(&param.value)
    }

    fn param(&self, name: &str) -> Option<&MaterialParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

impl Clone for Material {
    fn clone(&self) -> Self {
        Self {
            id: next_resource_id(),
            name: self.name.clone(),
            shader: self.shader.clone(),
            generation: self.generation,
            params: self.params.clone(),
        }
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Material")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shader", &self.shader.name())
            .field("uniforms", &self.params.len())
            .finish()
    }
}
