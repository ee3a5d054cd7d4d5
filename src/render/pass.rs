//! Render passes: the draw-call sequencer
//!
//! A [`RenderPass`] resolves its camera and lights once, then turns each
//! `draw` into backend commands. Redundant program and vertex buffer binds are
//! skipped; uniforms are rebuilt for every draw since the model matrix changes.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::backend::{GraphicsBackend, PassDescriptor, PassTarget};
use crate::error::DrawError;
use crate::render::RenderStats;
use crate::resources::{Framebuffer, Material, Mesh, Texture};
use crate::scene::{Camera, PackedLights, WorldLights};
use crate::shader::{ShaderReflection, UniformInfo, UniformLocation, UniformValue};

/// Where a pass renders to
#[derive(Debug, Clone, Default)]
pub enum RenderTarget {
    #[default]
    Screen,
    Framebuffer(Arc<Framebuffer>),
}

/// Configuration for a [`RenderPass`]
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub name: String,
    pub camera: Camera,
    pub lights: WorldLights,
    pub target: RenderTarget,
    /// Clear color and depth at the start of the pass
    pub clear: bool,
    /// Overrides the context's clear color
    pub clear_color: Option<[f32; 4]>,
}

impl RenderPassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            camera: Camera::default(),
            lights: WorldLights::default(),
            target: RenderTarget::Screen,
            clear: true,
            clear_color: None,
        }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_lights(mut self, lights: WorldLights) -> Self {
        self.lights = lights;
        self
    }

    pub fn with_framebuffer(mut self, framebuffer: Arc<Framebuffer>) -> Self {
        self.target = RenderTarget::Framebuffer(framebuffer);
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear = true;
        self.clear_color = Some(color);
        self
    }

    /// Keep the previous contents of the target.
    pub fn without_clear(mut self) -> Self {
        self.clear = false;
        self
    }
}

/// Engine globals shared by every draw of a pass
#[derive(Debug, Clone, Copy)]
struct PassGlobals {
    view: Mat4,
    projection: Mat4,
    camera_position: Vec3,
    ambient: Vec3,
    lights: PackedLights,
}

impl PassGlobals {
    /// Value of the engine global `name`, or `None` for unknown globals.
    fn value(&self, name: &str, model: Mat4) -> Option<UniformValue> {
        Some(match name {
            "g_model" => UniformValue::Mat4(model),
            "g_view" => UniformValue::Mat4(self.view),
            "g_projection" => UniformValue::Mat4(self.projection),
            "g_cameraPos" => UniformValue::Vec4(self.camera_position.extend(1.0)),
            "g_ambientLight" => UniformValue::Vec4(self.ambient.extend(1.0)),
            "g_lightPosType" => UniformValue::Vec4Array(self.lights.pos_type.to_vec()),
            "g_lightColorRange" => UniformValue::Vec4Array(self.lights.color_range.to_vec()),
            _ => return None,
        })
    }
}

/// An open render pass. Ends on [`finish`](RenderPass::finish) or drop.
pub struct RenderPass<'ctx, B: GraphicsBackend> {
    backend: &'ctx mut B,
    stats: &'ctx mut RenderStats,
    name: String,
    globals: PassGlobals,
    /// Keeps framebuffer textures alive while the pass is open
    _targets: Vec<Arc<Texture>>,
    bound_shader: Option<(u64, u64)>,
    bound_material: Option<u64>,
    bound_mesh: Option<u64>,
    draw_calls: u32,
    finished: bool,
}

impl<'ctx, B: GraphicsBackend> RenderPass<'ctx, B> {
    pub(crate) fn begin(
        backend: &'ctx mut B,
        stats: &'ctx mut RenderStats,
        desc: RenderPassDescriptor,
        default_clear_color: [f32; 4],
    ) -> Self {
        let (target, targets, (width, height)) = match &desc.target {
            RenderTarget::Screen => (PassTarget::Screen, Vec::new(), backend.surface_size()),
            RenderTarget::Framebuffer(framebuffer) => {
                let (target, textures) = framebuffer.pass_target();
                (target, textures, framebuffer.size())
            }
        };
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };

        let globals = PassGlobals {
            view: desc.camera.view_matrix(),
            projection: desc.camera.projection_matrix(aspect),
            camera_position: desc.camera.position,
            ambient: desc.lights.ambient,
            lights: desc.lights.pack(),
        };

        log::trace!("Begin render pass '{}' ({width}x{height})", desc.name);
        backend.begin_render_pass(&PassDescriptor {
            label: desc.name.clone(),
            target,
            clear_color: desc
                .clear
                .then(|| desc.clear_color.unwrap_or(default_clear_color)),
            clear_depth: desc.clear,
        });

        Self {
            backend,
            stats,
            name: desc.name,
            globals,
            _targets: targets,
            bound_shader: None,
            bound_material: None,
            bound_mesh: None,
            draw_calls: 0,
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Draw calls issued by this pass so far.
    pub fn draw_calls(&self) -> u32 {
        self.draw_calls
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.globals.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.globals.projection
    }

    /// Draw `mesh` with one material per sub-mesh.
    ///
    /// A mesh without index sets has a single sub-mesh covering all vertices.
    /// A wrong number of materials is rejected before anything is issued.
    pub fn draw(
        &mut self,
        mesh: &Mesh,
        transform: Mat4,
        materials: &[&Material],
    ) -> Result<(), DrawError> {
        if materials.len() != mesh.sub_mesh_count() {
            let err = DrawError::MaterialCountMismatch {
                mesh: mesh.name().to_string(),
                expected: mesh.sub_mesh_count(),
                found: materials.len(),
            };
            log::warn!("Render pass '{}': {err}", self.name);
            return Err(err);
        }

        for (sub_mesh, material) in materials.iter().enumerate() {
            self.draw_sub_mesh(mesh, sub_mesh, transform, material);
        }
        Ok(())
    }

    fn draw_sub_mesh(&mut self, mesh: &Mesh, sub_mesh: usize, model: Mat4, material: &Material) {
        let shader = material.shader();
        let (program, reflection, generation) = shader.linked();

        let shader_key = (shader.id(), generation);
        let shader_changed = self.bound_shader != Some(shader_key);
        if shader_changed {
            self.backend.set_program(program);
            self.bound_shader = Some(shader_key);
            self.stats.shader_changes += 1;
        }

        if self.bound_material != Some(material.id()) {
            self.bound_material = Some(material.id());
            self.stats.material_changes += 1;
        }

        let mesh_changed = self.bound_mesh != Some(mesh.id());
        if mesh_changed {
            self.bound_mesh = Some(mesh.id());
            self.stats.mesh_changes += 1;
        }

        if shader_changed || mesh_changed {
            self.backend
                .set_pipeline_state(&shader.pipeline_state(mesh.topology()));
            self.bind_vertex_buffers(mesh, &reflection);
        }

        self.bind_uniforms(&reflection, model, material);

        match mesh.index_sets().get(sub_mesh) {
            Some(index_set) => {
                self.backend.set_index_buffer(index_set.buffer);
                self.backend.draw_indexed(0..index_set.count);
            }
            None => self.backend.draw(0..mesh.vertex_count()),
        }
        self.draw_calls += 1;
        self.stats.draw_calls += 1;
    }

    /// Attributes the mesh lacks, or provides with the wrong base type, read zeros.
    fn bind_vertex_buffers(&mut self, mesh: &Mesh, reflection: &ShaderReflection) {
        for attribute in reflection.attributes() {
            let Some(format) = attribute.ty.vertex_format() else {
                continue;
            };
            match mesh.attribute(&attribute.name) {
                Some(data) if data.format.is_integer() == format.is_integer() => {
                    self.backend
                        .set_vertex_buffer(attribute.location, Some(data.buffer), data.format);
                }
                _ => self
                    .backend
                    .set_vertex_buffer(attribute.location, None, format),
            }
        }
    }

    fn bind_uniforms(&mut self, reflection: &ShaderReflection, model: Mat4, material: &Material) {
        let mut blocks: Vec<Vec<u8>> = reflection
            .blocks()
            .iter()
            .map(|block| vec![0u8; block.size as usize])
            .collect();

        for uniform in reflection.uniforms() {
            match uniform.location {
                UniformLocation::Block {
                    group,
                    binding,
                    offset,
                    stride,
                } => {
                    let Some(block) = reflection.block_index(group, binding) else {
                        continue;
                    };
                    let buffer = &mut blocks[block];
                    let offset = offset as usize;
                    let stride = stride as usize;
                    if uniform.is_engine_global() {
                        if let Some(value) = self.global_value(uniform, model) {
                            value.write_std140(buffer, offset, stride);
                        }
                    } else if let Some(value) = material.value_for(uniform) {
                        value.write_std140(buffer, offset, stride);
                    }
                }
                UniformLocation::Texture { .. } => {
                    let Some(layout) = uniform.texture_layout() else {
                        continue;
                    };
                    let texture = match material.value_for(uniform) {
                        Some(UniformValue::Texture {
                            texture: Some(texture),
                            ..
                        }) if texture.is_cubemap() == layout.cubemap => Some(texture.handle()),
                        _ => None,
                    };
                    self.backend.set_texture(&layout, texture);
                }
            }
        }

        for (block, data) in reflection.blocks().iter().zip(&blocks) {
            self.backend
                .set_uniform_block(block.group, block.binding, data);
        }
    }

    fn global_value(&self, uniform: &UniformInfo, model: Mat4) -> Option<UniformValue> {
        let value = self.globals.value(&uniform.name, model)?;
        let matches = value.uniform_type() == uniform.ty
            && (!value.is_array() || uniform.array_size > 1);
        matches.then_some(value)
    }

    /// End the pass.
    pub fn finish(mut self) {
        self.end();
    }

    fn end(&mut self) {
        if !self.finished {
            self.finished = true;
            self.backend.end_render_pass();
            log::trace!(
                "End render pass '{}' ({} draw calls)",
                self.name,
                self.draw_calls
            );
        }
    }
}

impl<B: GraphicsBackend> Drop for RenderPass<'_, B> {
    fn drop(&mut self) {
        self.end();
    }
}
