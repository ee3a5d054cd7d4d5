//! Offscreen render targets

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::PassTarget;
use crate::error::ResourceError;
use crate::resources::next_resource_id;
use crate::resources::Texture;

/// Configuration for building a [`Framebuffer`]. Validated by the render context.
#[derive(Debug, Clone)]
pub struct FramebufferDescriptor {
    pub name: String,
    pub colors: Vec<Arc<Texture>>,
    pub depth: Option<Arc<Texture>>,
}

impl FramebufferDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            colors: Vec::new(),
            depth: None,
        }
    }

    pub fn with_color_texture(mut self, texture: Arc<Texture>) -> Self {
        self.colors.push(texture);
        self
    }

    pub fn with_depth_texture(mut self, texture: Arc<Texture>) -> Self {
        self.depth = Some(texture);
        self
    }
}

#[derive(Debug, Clone)]
struct Targets {
    colors: Vec<Arc<Texture>>,
    depth: Option<Arc<Texture>>,
}

/// A set of color targets and an optional depth target of one size.
///
/// Owns no GPU object itself; it keeps its textures alive.
pub struct Framebuffer {
    id: u64,
    name: String,
    width: u32,
    height: u32,
    targets: RwLock<Targets>,
}

impl Framebuffer {
    pub(crate) fn create(desc: &FramebufferDescriptor) -> Result<Self, ResourceError> {
        let invalid = |reason: String| {
            Err(ResourceError::InvalidDescriptor(format!(
                "framebuffer '{}': {reason}",
                desc.name
            )))
        };
        let Some(first) = desc.colors.first().or(desc.depth.as_ref()) else {
            return invalid("needs at least one color or depth texture".to_string());
        };
        let size = first.size();

        for texture in &desc.colors {
            if texture.is_depth() || texture.is_cubemap() {
                return invalid(format!("'{}' cannot be a color target", texture.name()));
            }
            if texture.size() != size {
                return invalid(format!("'{}' does not match size {size:?}", texture.name()));
            }
        }
        if let Some(depth) = &desc.depth {
            if !depth.is_depth() {
                return invalid(format!("'{}' is not a depth texture", depth.name()));
            }
            if depth.size() != size {
                return invalid(format!("'{}' does not match size {size:?}", depth.name()));
            }
        }

        Ok(Self {
            id: next_resource_id(),
            name: desc.name.clone(),
            width: size.0,
            height: size.1,
            targets: RwLock::new(Targets {
                colors: desc.colors.clone(),
                depth: desc.depth.clone(),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_textures(&self) -> Vec<Arc<Texture>> {
        self.targets.read().colors.clone()
    }

    pub fn color_texture_count(&self) -> usize {
        self.targets.read().colors.len()
    }

    pub fn depth_texture(&self) -> Option<Arc<Texture>> {
        self.targets.read().depth.clone()
    }

    /// Replace (or append, when `index` equals the count) a color target.
    pub fn set_color_texture(
        &self,
        index: usize,
        texture: Arc<Texture>,
    ) -> Result<(), ResourceError> {
        if texture.size() != self.size() || texture.is_depth() || texture.is_cubemap() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "framebuffer '{}': '{}' is not a {}x{} color texture",
                self.name,
                texture.name(),
                self.width,
                self.height
            )));
        }
        let mut targets = self.targets.write();
        match index.cmp(&targets.colors.len()) {
            std::cmp::Ordering::Less => targets.colors[index] = texture,
            std::cmp::Ordering::Equal => targets.colors.push(texture),
            std::cmp::Ordering::Greater => {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "framebuffer '{}': color index {index} out of range",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Snapshot of the current targets, kept alive for the duration of a pass.
    pub(crate) fn pass_target(&self) -> (PassTarget, Vec<Arc<Texture>>) {
        let targets = self.targets.read();
        let mut keep_alive = targets.colors.clone();
        keep_alive.extend(targets.depth.clone());
        let target = PassTarget::Textures {
            colors: targets.colors.iter().map(|t| t.handle()).collect(),
            depth: targets.depth.as_ref().map(|t| t.handle()),
            width: self.width,
            height: self.height,
        };
        (target, keep_alive)
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size())
            .field("colors", &self.color_texture_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::resources::{ReleaseQueue, TextureDescriptor};

    fn texture(backend: &mut DummyBackend, desc: TextureDescriptor) -> Arc<Texture> {
        Arc::new(Texture::create(backend, &desc, ReleaseQueue::new()).unwrap())
    }

    #[test]
    fn test_requires_matching_sizes() {
        let mut backend = DummyBackend::new();
        let color = texture(&mut backend, TextureDescriptor::render_target(64, 64));
        let depth = texture(&mut backend, TextureDescriptor::depth_target(32, 32));

        let desc = FramebufferDescriptor::new("fb")
            .with_color_texture(color)
            .with_depth_texture(depth);
        assert!(Framebuffer::create(&desc).is_err());
    }

    #[test]
    fn test_requires_a_target() {
        assert!(Framebuffer::create(&FramebufferDescriptor::new("empty")).is_err());
    }

    #[test]
    fn test_set_color_texture() {
        let mut backend = DummyBackend::new();
        let first = texture(&mut backend, TextureDescriptor::render_target(16, 16));
        let second = texture(&mut backend, TextureDescriptor::render_target(16, 16));
        let wrong = texture(&mut backend, TextureDescriptor::render_target(8, 8));

        let framebuffer =
            Framebuffer::create(&FramebufferDescriptor::new("fb").with_color_texture(first))
                .unwrap();
        framebuffer.set_color_texture(0, second.clone()).unwrap();
        assert_eq!(framebuffer.color_textures()[0].id(), second.id());

        assert!(framebuffer.set_color_texture(0, wrong).is_err());
        assert!(framebuffer.set_color_texture(5, second).is_err());
    }
}
