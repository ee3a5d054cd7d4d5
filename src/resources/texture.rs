//! Textures and texture descriptors

use std::fmt;

use crate::backend::{GpuTextureDescriptor, GraphicsBackend, TextureFormat, TextureHandle, WrapMode};
use crate::error::ResourceError;
use crate::resources::next_resource_id;
use crate::resources::release::{PendingRelease, ReleaseQueue};

/// Pixel content of a texture
#[derive(Debug, Clone, PartialEq)]
pub enum TextureData {
    /// Uninitialized, for render targets
    Empty,
    /// Tightly packed rows of a 2D image
    Pixels(Vec<u8>),
    /// Six faces in +X, -X, +Y, -Y, +Z, -Z order
    Cube(Box<[Vec<u8>; 6]>),
}

/// Configuration for building a [`Texture`]. Validated by the render context.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: TextureData,
    pub filter_linear: bool,
    pub mipmaps: bool,
    pub wrap: WrapMode,
    pub render_target: bool,
}

impl TextureDescriptor {
    /// 2D texture from decoded RGBA8 pixels.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            name: "Unnamed texture".to_string(),
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            data: TextureData::Pixels(pixels),
            filter_linear: true,
            mipmaps: false,
            wrap: WrapMode::Repeat,
            render_target: false,
        }
    }

    /// Cubemap from six RGBA8 faces.
    pub fn cubemap(width: u32, height: u32, faces: [Vec<u8>; 6]) -> Self {
        Self {
            data: TextureData::Cube(Box::new(faces)),
            wrap: WrapMode::ClampToEdge,
            ..Self::from_pixels(width, height, Vec::new())
        }
    }

    /// Color target for offscreen rendering.
    pub fn render_target(width: u32, height: u32) -> Self {
        Self {
            name: "Render target".to_string(),
            format: TextureFormat::Rgba8Unorm,
            data: TextureData::Empty,
            wrap: WrapMode::ClampToEdge,
            render_target: true,
            ..Self::from_pixels(width, height, Vec::new())
        }
    }

    /// Depth target for offscreen rendering.
    pub fn depth_target(width: u32, height: u32) -> Self {
        Self {
            name: "Depth target".to_string(),
            format: TextureFormat::Depth32Float,
            filter_linear: false,
            ..Self::render_target(width, height)
        }
    }

    /// 1x1 texture of a single color.
    pub fn solid_color(color: [u8; 4]) -> Self {
        Self {
            name: "Solid color".to_string(),
            ..Self::from_pixels(1, 1, color.to_vec())
        }
    }

    /// Checkerboard of 8x8 pixel cells.
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                data.extend_from_slice(if is_even { &color1 } else { &color2 });
            }
        }
        Self {
            name: "Checkerboard".to_string(),
            ..Self::from_pixels(size, size, data)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter_linear(mut self, enabled: bool) -> Self {
        self.filter_linear = enabled;
        self
    }

    pub fn with_mipmaps(mut self, enabled: bool) -> Self {
        self.mipmaps = enabled;
        self
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn is_cubemap(&self) -> bool {
        matches!(self.data, TextureData::Cube(_))
    }

    fn validate(&self) -> Result<(), ResourceError> {
        let invalid = |reason: String| {
            Err(ResourceError::InvalidDescriptor(format!(
                "texture '{}': {reason}",
                self.name
            )))
        };
        if self.width == 0 || self.height == 0 {
            return invalid(format!("size {}x{} is empty", self.width, self.height));
        }
        let layer_size = (self.width as u64 * self.height as u64)
            .checked_mul(self.format.bytes_per_pixel() as u64)
            .and_then(|size| usize::try_from(size).ok());
        let Some(layer_size) = layer_size else {
            return invalid(format!(
                "size {}x{} does not fit in memory",
                self.width, self.height
            ));
        };
        match &self.data {
            TextureData::Empty => {}
            TextureData::Pixels(pixels) if pixels.len() != layer_size => {
                return invalid(format!(
                    "expected {layer_size} bytes of pixel data, got {}",
                    pixels.len()
                ));
            }
            TextureData::Pixels(_) => {}
            TextureData::Cube(faces) => {
                if self.format.is_depth() {
                    return invalid("depth textures cannot be cubemaps".to_string());
                }
                if self.width != self.height {
                    return invalid("cubemap faces must be square".to_string());
                }
                if let Some(face) = faces.iter().position(|f| f.len() != layer_size) {
                    return invalid(format!("cubemap face {face} has the wrong size"));
                }
            }
        }
        if self.render_target && self.is_cubemap() {
            return invalid("render targets cannot be cubemaps".to_string());
        }
        Ok(())
    }
}

/// GPU texture and the parameters it was created with.
pub struct Texture {
    id: u64,
    name: String,
    handle: TextureHandle,
    width: u32,
    height: u32,
    format: TextureFormat,
    cubemap: bool,
    filter_linear: bool,
    mipmaps: bool,
    wrap: WrapMode,
    render_target: bool,
    release: ReleaseQueue,
}

impl Texture {
    /// Validate, allocate and upload.
    pub(crate) fn create<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        desc: &TextureDescriptor,
        release: ReleaseQueue,
    ) -> Result<Self, ResourceError> {
        desc.validate()?;
        let cubemap = desc.is_cubemap();
        let mip_levels = if desc.mipmaps {
            32 - desc.width.max(desc.height).leading_zeros()
        } else {
            1
        };
        let handle = backend.create_texture(&GpuTextureDescriptor {
            label: desc.name.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            cubemap,
            mip_levels,
            filter_linear: desc.filter_linear,
            wrap: desc.wrap,
            render_target: desc.render_target,
        })?;

        match &desc.data {
            TextureData::Empty => {}
            TextureData::Pixels(pixels) => backend.write_texture(handle, 0, pixels),
            TextureData::Cube(faces) => {
                for (layer, face) in faces.iter().enumerate() {
                    backend.write_texture(handle, layer as u32, face);
                }
            }
        }

        Ok(Self {
            id: next_resource_id(),
            name: desc.name.clone(),
            handle,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            cubemap,
            filter_linear: desc.filter_linear,
            mipmaps: desc.mipmaps,
            wrap: desc.wrap,
            render_target: desc.render_target,
            release,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn is_cubemap(&self) -> bool {
        self.cubemap
    }

    pub fn is_filter_linear(&self) -> bool {
        self.filter_linear
    }

    pub fn has_mipmaps(&self) -> bool {
        self.mipmaps
    }

    pub fn wrap(&self) -> WrapMode {
        self.wrap
    }

    pub fn is_render_target(&self) -> bool {
        self.render_target
    }

    pub fn is_depth(&self) -> bool {
        self.format.is_depth()
    }

    /// Estimated GPU memory in bytes.
    pub fn data_size(&self) -> u64 {
        let mut size =
            self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64;
        if self.cubemap {
            size *= 6;
        }
        if self.mipmaps {
            size = size * 4 / 3;
        }
        size
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &(self.width, self.height))
            .field("format", &self.format)
            .field("cubemap", &self.cubemap)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.release.push(PendingRelease::Texture(self.handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_data_size() {
        let mut backend = DummyBackend::new();
        let queue = ReleaseQueue::new();

        let plain = Texture::create(
            &mut backend,
            &TextureDescriptor::from_pixels(4, 4, vec![0; 64]),
            queue.clone(),
        )
        .unwrap();
        assert_eq!(plain.data_size(), 64);

        let mipmapped = Texture::create(
            &mut backend,
            &TextureDescriptor::from_pixels(4, 4, vec![0; 64]).with_mipmaps(true),
            queue.clone(),
        )
        .unwrap();
        assert_eq!(mipmapped.data_size(), 85);

        let faces: [Vec<u8>; 6] = std::array::from_fn(|_| vec![0; 16]);
        let cube =
            Texture::create(&mut backend, &TextureDescriptor::cubemap(2, 2, faces), queue).unwrap();
        assert!(cube.is_cubemap());
        assert_eq!(cube.data_size(), 96);
    }

    #[test]
    fn test_rejects_wrong_pixel_count() {
        let mut backend = DummyBackend::new();
        let result = Texture::create(
            &mut backend,
            &TextureDescriptor::from_pixels(2, 2, vec![0; 3]),
            ReleaseQueue::new(),
        );
        assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
        assert_eq!(backend.live_texture_count(), 0);
    }

    #[test]
    fn test_drop_queues_release() {
        let mut backend = DummyBackend::new();
        let queue = ReleaseQueue::new();
        let texture = Texture::create(
            &mut backend,
            &TextureDescriptor::solid_color([255; 4]),
            queue.clone(),
        )
        .unwrap();
        drop(texture);
        assert_eq!(queue.release_all(&mut backend), 1);
        assert_eq!(backend.live_texture_count(), 0);
    }
}
