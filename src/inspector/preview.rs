//! Offscreen previews of shaders and meshes

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use crate::backend::GraphicsBackend;
use crate::error::{RenderError, ResourceError};
use crate::render::{RenderContext, RenderPass, RenderPassDescriptor};
use crate::resources::{
    Bounds, Framebuffer, FramebufferDescriptor, Material, Mesh, MeshDescriptor, Texture,
    TextureDescriptor,
};
use crate::scene::{Camera, Light, Projection, WorldLights};
use crate::shader::{DefaultShader, Shader, UniformValue};

const PREVIEW_CLEAR_COLOR: [f32; 4] = [0.15, 0.15, 0.15, 1.0];

/// Fixed camera all previews are rendered with.
pub fn preview_camera() -> Camera {
    Camera::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO)
        .with_projection(Projection::perspective(60.0, 0.1, 10.0))
}

/// A single point light at the camera, ambient 0.2.
pub fn preview_lights() -> WorldLights {
    WorldLights::new(Vec3::splat(0.2)).with_light(Light::point(
        Vec3::new(0.0, 0.0, 4.0),
        Vec3::ONE,
        20.0,
    ))
}

/// Model matrix centering `bounds` at the origin, scaled to a largest extent
/// of 2 and rotated about Y by `angle` radians.
pub fn preview_transform(bounds: Bounds, angle: f32) -> Mat4 {
    let max_extent = bounds.extent().max_element();
    let scale = if max_extent > f32::EPSILON {
        2.0 / max_extent
    } else {
        1.0
    };
    Mat4::from_rotation_y(angle)
        * Mat4::from_scale(Vec3::splat(scale))
        * Mat4::from_translation(-bounds.center())
}

/// Render targets for previews, reused across frames.
///
/// Every preview drawn in a frame gets its own color texture; `reset` makes
/// all of them available again. None of these resources are registered, so
/// they never show up in the inspector's own lists.
pub(crate) struct PreviewPool {
    size: u32,
    textures: Vec<Arc<Texture>>,
    next: usize,
    framebuffer: Option<Arc<Framebuffer>>,
    sphere: Option<Arc<Mesh>>,
}

impl PreviewPool {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(1),
            textures: Vec::new(),
            next: 0,
            framebuffer: None,
            sphere: None,
        }
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Textures allocated so far.
    pub fn allocated(&self) -> usize {
        self.textures.len()
    }

    /// Textures handed out since the last reset.
    pub fn in_use(&self) -> usize {
        self.next
    }

    /// Next free texture, allocating one when all are in use.
    pub fn acquire<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
    ) -> Result<Arc<Texture>, ResourceError> {
        if let Some(texture) = self.textures.get(self.next) {
            self.next += 1;
            return Ok(texture.clone());
        }
        let desc = TextureDescriptor::render_target(self.size, self.size)
            .with_name(format!("Inspector preview {}", self.textures.len()));
        let texture = ctx.create_texture_untracked(&desc)?;
        self.textures.push(texture.clone());
        self.next += 1;
        log::debug!("Inspector preview pool grew to {} textures", self.textures.len());
        Ok(texture)
    }

    /// Render into a fresh pool texture with the preview camera and lights.
    pub fn render<B, F>(
        &mut self,
        ctx: &mut RenderContext<B>,
        draw: F,
    ) -> Result<Arc<Texture>, RenderError>
    where
        B: GraphicsBackend,
        F: FnOnce(&mut RenderPass<'_, B>) -> Result<(), RenderError>,
    {
        let texture = self.acquire(ctx)?;
        let framebuffer = self.framebuffer(ctx, &texture)?;

        let desc = RenderPassDescriptor::new("Inspector preview")
            .with_camera(preview_camera())
            .with_lights(preview_lights())
            .with_framebuffer(framebuffer)
            .with_clear_color(PREVIEW_CLEAR_COLOR);
        let mut pass = ctx.render_pass(desc);
        draw(&mut pass)?;
        pass.finish();
        Ok(texture)
    }

    /// Rotating sphere drawn with a fresh material of `shader`.
    pub fn render_shader<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        shader: &Arc<Shader>,
        angle: f32,
    ) -> Result<Arc<Texture>, RenderError> {
        let sphere = self.sphere(ctx)?;
        let mut material = shader.create_material();
        if matches!(material.get("color"), Some(UniformValue::Vec4(_))) {
            material.set("color", Vec4::ONE)?;
        }

        self.render(ctx, |pass| {
            pass.draw(&sphere, Mat4::from_rotation_y(angle), &[&material])?;
            Ok(())
        })
    }

    /// `mesh` auto-fitted into view, lit when it has normals.
    pub fn render_mesh<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        mesh: &Mesh,
        angle: f32,
    ) -> Result<Arc<Texture>, RenderError> {
        let kind = if mesh.has_attribute("normal") {
            DefaultShader::Standard
        } else {
            DefaultShader::Unlit
        };
        let shader = ctx.default_shader(kind)?;
        let mut material = shader.create_material();
        material.set("color", Vec4::ONE)?;
        let materials: Vec<Material> = (0..mesh.sub_mesh_count())
            .map(|_| material.clone())
            .collect();
        let material_refs: Vec<&Material> = materials.iter().collect();

        let transform = preview_transform(mesh.bounds(), angle);
        self.render(ctx, |pass| {
            pass.draw(mesh, transform, &material_refs)?;
            Ok(())
        })
    }

    fn sphere<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
    ) -> Result<Arc<Mesh>, ResourceError> {
        if let Some(sphere) = &self.sphere {
            return Ok(sphere.clone());
        }
        let desc = MeshDescriptor::sphere(32, 16).with_name("Inspector preview sphere");
        let sphere = ctx.create_mesh_untracked(&desc)?;
        self.sphere = Some(sphere.clone());
        Ok(sphere)
    }

    fn framebuffer<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        color: &Arc<Texture>,
    ) -> Result<Arc<Framebuffer>, ResourceError> {
        if let Some(framebuffer) = &self.framebuffer {
            framebuffer.set_color_texture(0, color.clone())?;
            return Ok(framebuffer.clone());
        }
        let depth = ctx.create_texture_untracked(
            &TextureDescriptor::depth_target(self.size, self.size)
                .with_name("Inspector preview depth"),
        )?;
        let desc = FramebufferDescriptor::new("Inspector preview")
            .with_color_texture(color.clone())
            .with_depth_texture(depth);
        let framebuffer = ctx.create_framebuffer_untracked(&desc)?;
        self.framebuffer = Some(framebuffer.clone());
        Ok(framebuffer)
    }
}
