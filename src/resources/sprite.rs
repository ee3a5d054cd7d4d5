//! Sprite atlases: named regions of a shared texture

use std::fmt;
use std::sync::Arc;

use glam::{UVec2, Vec2};

use crate::error::ResourceError;
use crate::resources::next_resource_id;
use crate::resources::Texture;

/// Rectangle of an atlas texture in pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteRegion {
    pub position: UVec2,
    pub size: UVec2,
    /// Pivot in normalized region coordinates
    pub anchor: Vec2,
}

impl SpriteRegion {
    pub fn new(position: UVec2, size: UVec2) -> Self {
        Self {
            position,
            size,
            anchor: Vec2::splat(0.5),
        }
    }

    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Configuration for building a [`SpriteAtlas`]. Validated by the render context.
#[derive(Debug, Clone)]
pub struct SpriteAtlasDescriptor {
    pub name: String,
    pub texture: Arc<Texture>,
    pub sprites: Vec<(String, SpriteRegion)>,
}

impl SpriteAtlasDescriptor {
    pub fn new(name: impl Into<String>, texture: Arc<Texture>) -> Self {
        Self {
            name: name.into(),
            texture,
            sprites: Vec::new(),
        }
    }

    pub fn with_sprite(mut self, name: impl Into<String>, region: SpriteRegion) -> Self {
        self.sprites.push((name.into(), region));
        self
    }
}

/// Texture partitioned into named sprites.
pub struct SpriteAtlas {
    id: u64,
    name: String,
    texture: Arc<Texture>,
    sprites: Vec<(String, SpriteRegion)>,
}

impl SpriteAtlas {
    pub(crate) fn create(desc: &SpriteAtlasDescriptor) -> Result<Self, ResourceError> {
        let (width, height) = desc.texture.size();
        for (index, (name, region)) in desc.sprites.iter().enumerate() {
            let inside = |start: u32, size: u32, limit: u32| {
                size > 0 && start.checked_add(size).is_some_and(|end| end <= limit)
            };
            if !inside(region.position.x, region.size.x, width)
                || !inside(region.position.y, region.size.y, height)
            {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "sprite atlas '{}': sprite '{name}' lies outside the {width}x{height} texture",
                    desc.name
                )));
            }
            if desc.sprites[..index].iter().any(|(other, _)| other == name) {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "sprite atlas '{}': duplicate sprite '{name}'",
                    desc.name
                )));
            }
        }
        Ok(Self {
            id: next_resource_id(),
            name: desc.name.clone(),
            texture: desc.texture.clone(),
            sprites: desc.sprites.clone(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sprites.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<Sprite<'_>> {
        self.sprites
            .iter()
            .find(|(n, _)| n == name)
            .map(|(name, region)| Sprite {
                name,
                region,
                texture: &self.texture,
            })
    }

    pub fn sprite_at(&self, index: usize) -> Option<Sprite<'_>> {
        self.sprites.get(index).map(|(name, region)| Sprite {
            name,
            region,
            texture: &self.texture,
        })
    }
}

impl fmt::Debug for SpriteAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteAtlas")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("sprites", &self.sprites.len())
            .finish()
    }
}

/// Borrowed view of one atlas region. Does not own the texture.
#[derive(Debug, Clone, Copy)]
pub struct Sprite<'a> {
    name: &'a str,
    region: &'a SpriteRegion,
    texture: &'a Arc<Texture>,
}

impl<'a> Sprite<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn position(&self) -> UVec2 {
        self.region.position
    }

    pub fn size(&self) -> UVec2 {
        self.region.size
    }

    pub fn anchor(&self) -> Vec2 {
        self.region.anchor
    }

    pub fn texture(&self) -> &'a Arc<Texture> {
        self.texture
    }

    /// Normalized texture coordinates of the region as (min, max).
    pub fn uv_rect(&self) -> (Vec2, Vec2) {
        let texture_size = Vec2::new(self.texture.width() as f32, self.texture.height() as f32);
        let min = self.region.position.as_vec2() / texture_size;
        let max = (self.region.position + self.region.size).as_vec2() / texture_size;
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::resources::{ReleaseQueue, TextureDescriptor};

    fn atlas_texture() -> Arc<Texture> {
        let desc = TextureDescriptor::from_pixels(64, 32, vec![0; 64 * 32 * 4]);
        Arc::new(Texture::create(&mut DummyBackend::new(), &desc, ReleaseQueue::new()).unwrap())
    }

    #[test]
    fn test_uv_rect() {
        let atlas = SpriteAtlas::create(
            &SpriteAtlasDescriptor::new("ui", atlas_texture())
                .with_sprite("button", SpriteRegion::new(UVec2::new(16, 8), UVec2::new(16, 8))),
        )
        .unwrap();

        let sprite = atlas.get("button").unwrap();
        let (min, max) = sprite.uv_rect();
        assert_eq!(min, Vec2::new(0.25, 0.25));
        assert_eq!(max, Vec2::new(0.5, 0.5));
        assert_eq!(sprite.anchor(), Vec2::splat(0.5));
        assert!(atlas.get("missing").is_none());
    }

    #[test]
    fn test_rejects_region_outside_texture() {
        let desc = SpriteAtlasDescriptor::new("ui", atlas_texture())
            .with_sprite("wide", SpriteRegion::new(UVec2::new(60, 0), UVec2::new(8, 8)));
        assert!(SpriteAtlas::create(&desc).is_err());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let region = SpriteRegion::new(UVec2::ZERO, UVec2::ONE);
        let desc = SpriteAtlasDescriptor::new("ui", atlas_texture())
            .with_sprite("a", region)
            .with_sprite("a", region);
        assert!(SpriteAtlas::create(&desc).is_err());
    }
}
