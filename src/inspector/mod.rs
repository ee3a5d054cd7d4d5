//! Inspector: a debug overlay listing live render resources
//!
//! Call [`Inspector::update`] once per frame with the finished frame's
//! statistics, then [`Inspector::render_gui`] with any [`UiSurface`]. The
//! inspector reads the context's registries, renders previews into pooled
//! offscreen textures and hosts a live shader editor.
//!
//! ```ignore
//! let stats = ctx.end_frame();
//! inspector.update(stats);
//! egui::CentralPanel::default().show(&egui_ctx, |ui| {
//!     inspector.render_gui(&mut ctx, &mut EguiSurface::new(ui, &texture_ids));
//! });
//! ```

mod egui_surface;
mod preview;
mod shader_editor;
mod ui;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;

pub use egui_surface::EguiSurface;
pub use preview::{preview_camera, preview_lights, preview_transform};
pub use ui::{CodeEditor, ImageDesc, Language, Palette, PlainTextEditor, UiSurface};

use crate::backend::GraphicsBackend;
use crate::config::InspectorConfig;
use crate::render::{FrameStatistics, Metric, RenderContext, RenderStats};
use crate::resources::{Framebuffer, Mesh, SpriteAtlas, Texture};
use crate::scene::MAX_SCENE_LIGHTS;
use crate::shader::{Shader, ShaderStage};
use preview::PreviewPool;
use shader_editor::ShaderEditorSession;

const BYTES_PER_MB: f32 = 1024.0 * 1024.0;
const PLOT_SIZE: Vec2 = Vec2::new(240.0, 48.0);

/// Debug overlay state kept across frames.
pub struct Inspector {
    config: InspectorConfig,
    stats: FrameStatistics,
    frame_count: u64,
    /// Seconds of recorded frame time, drives preview rotation
    time: f32,
    last_update: Instant,
    previews: PreviewPool,
    sprite_selection: HashMap<u64, Option<usize>>,
    editor: Option<ShaderEditorSession>,
    visible: bool,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new(InspectorConfig::default())
    }
}

impl Inspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self {
            stats: FrameStatistics::new(config.frames),
            previews: PreviewPool::new(config.preview_texture_size),
            config,
            frame_count: 0,
            time: 0.0,
            last_update: Instant::now(),
            sprite_selection: HashMap::new(),
            editor: None,
            visible: true,
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn statistics(&self) -> &FrameStatistics {
        &self.stats
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Record a finished frame, timed against the previous call or, for the
    /// first frame, against construction.
    pub fn update(&mut self, stats: RenderStats) {
        let now = Instant::now();
        let delta_ms = now.duration_since(self.last_update).as_secs_f32() * 1000.0;
        self.last_update = now;
        self.record_frame(stats, delta_ms);
    }

    /// Record a finished frame with an explicit frame time.
    pub fn record_frame(&mut self, stats: RenderStats, delta_ms: f32) {
        self.time += delta_ms / 1000.0;
        self.stats.push(stats, delta_ms);
        self.frame_count += 1;
        self.previews.reset();
    }

    /// Sprite index selected in an atlas node. `None` until the atlas was
    /// shown, and again once it is gone.
    pub fn selected_sprite(&self, atlas_id: u64) -> Option<usize> {
        self.sprite_selection.get(&atlas_id).copied().flatten()
    }

    /// Shader currently open in the editor, if any.
    pub fn editing_shader(&self) -> Option<Arc<Shader>> {
        self.editor.as_ref().and_then(ShaderEditorSession::shader)
    }

    /// Start editing `shader`, replacing any open session.
    pub fn edit_shader(&mut self, shader: &Arc<Shader>) {
        if self.editor.as_ref().is_some_and(|e| e.is_for(shader)) {
            return;
        }
        self.editor = Some(ShaderEditorSession::open(shader));
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Stage shown in the editor and its current text.
    pub fn editor_text(&self) -> Option<(ShaderStage, String)> {
        let session = self.editor.as_ref()?;
        Some((session.current_stage()?, session.editor().text().to_string()))
    }

    /// Replace the text of the stage shown in the editor.
    pub fn set_editor_text(&mut self, text: &str) {
        if let Some(session) = &mut self.editor {
            session.editor_mut().set_text(text);
        }
    }

    /// Last compile errors of the editor session.
    pub fn editor_errors(&self) -> Option<String> {
        self.editor
            .as_ref()
            .and_then(|e| e.errors().map(str::to_string))
    }

    /// Draw the inspector and, when open, the shader editor.
    pub fn render_gui<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        ui: &mut dyn UiSurface,
    ) {
        if self.visible {
            let mut open = true;
            ui.window("Inspector", &mut open, None, &mut |ui| {
                self.sections(ctx, ui);
            });
            self.visible = open;
        }

        if let Some(session) = &mut self.editor {
            let size = Vec2::from(self.config.editor_size);
            if !session.show(ctx, ui, size) {
                log::debug!("Shader editor closed");
                self.editor = None;
            }
        }
    }

    fn sections<B: GraphicsBackend>(&mut self, ctx: &mut RenderContext<B>, ui: &mut dyn UiSurface) {
        ui.collapsing_header("Renderer", &mut |ui| self.renderer_section(ctx, ui));
        ui.collapsing_header("Performance", &mut |ui| self.performance_section(ui));
        ui.collapsing_header("Memory", &mut |ui| self.memory_section(ui));

        let shaders = ctx.shaders().live();
        ui.collapsing_header(&format!("Shaders ({})", shaders.len()), &mut |ui| {
            for shader in &shaders {
                self.shader_node(ctx, ui, shader);
            }
        });

        let textures = ctx.textures().live();
        ui.collapsing_header(&format!("Textures ({})", textures.len()), &mut |ui| {
            for texture in &textures {
                self.texture_node(ui, texture);
            }
        });

        let meshes = ctx.meshes().live();
        ui.collapsing_header(&format!("Meshes ({})", meshes.len()), &mut |ui| {
            for mesh in &meshes {
                self.mesh_node(ctx, ui, mesh);
            }
        });

        let atlases = ctx.sprite_atlases().live();
        self.sprite_selection
            .retain(|id, _| atlases.iter().any(|atlas| atlas.id() == *id));
        ui.collapsing_header(&format!("Sprite atlases ({})", atlases.len()), &mut |ui| {
            for atlas in &atlases {
                self.sprite_atlas_node(ui, atlas);
            }
        });

        let framebuffers = ctx.framebuffers().live();
        ui.collapsing_header(&format!("Framebuffers ({})", framebuffers.len()), &mut |ui| {
            for framebuffer in &framebuffers {
                framebuffer_node(ui, framebuffer);
            }
        });
    }

    fn renderer_section<B: GraphicsBackend>(&self, ctx: &RenderContext<B>, ui: &mut dyn UiSurface) {
        let (width, height) = ctx.backend().surface_size();
        ui.label_value("Backend", ctx.backend().name());
        ui.label_value("Surface", &format!("{width}x{height}"));
        ui.label_value("Frames", &self.frame_count.to_string());
        ui.label_value("Max scene lights", &MAX_SCENE_LIGHTS.to_string());
        let [r, g, b, a] = ctx.config().clear_color;
        ui.label_value("Clear color", &format!("({r:.2}, {g:.2}, {b:.2}, {a:.2})"));
        for (name, value) in ctx.preprocessor().defines() {
            ui.label_value(&format!("#define {name}"), value);
        }
    }

    fn performance_section(&self, ui: &mut dyn UiSurface) {
        self.plot(ui, "Frame time (ms)", Metric::FrameTime, 1.0);
        self.plot(ui, "Draw calls", Metric::DrawCalls, 1.0);
        self.plot(ui, "State changes", Metric::StateChanges, 1.0);
    }

    fn memory_section(&self, ui: &mut dyn UiSurface) {
        self.plot(ui, "Mesh memory (MB)", Metric::MeshBytes, BYTES_PER_MB);
        self.plot(ui, "Texture memory (MB)", Metric::TextureBytes, BYTES_PER_MB);
        if let Some(latest) = self.stats.latest() {
            ui.label_value("Meshes", &latest.mesh_count.to_string());
            ui.label_value("Textures", &latest.texture_count.to_string());
        }
    }

    fn plot(&self, ui: &mut dyn UiSurface, label: &str, metric: Metric, divisor: f32) {
        let values: Vec<f32> = self
            .stats
            .series(metric)
            .into_iter()
            .map(|v| v / divisor)
            .collect();
        let max = self.stats.max(metric) / divisor;
        let average = self.stats.average(metric) / divisor;
        ui.plot_lines(
            &format!("{label}: avg {average:.2}, max {max:.2}"),
            &values,
            (0.0, max * 1.2),
            PLOT_SIZE,
        );
    }

    fn preview_size(&self) -> Vec2 {
        Vec2::splat(self.config.preview_display_size)
    }

    fn preview_angle(&self) -> f32 {
        self.time * self.config.rotation_speed
    }

    fn shader_node<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        ui: &mut dyn UiSurface,
        shader: &Arc<Shader>,
    ) {
        let id = format!("shader-{}", shader.id());
        ui.tree_node(&id, shader.name(), &mut |ui| {
            let reflection = shader.reflection();
            ui.text("Attributes");
            for attribute in reflection.attributes() {
                ui.label_value(
                    &attribute.name,
                    &format!("{} (location {})", attribute.ty.glsl_name(), attribute.location),
                );
            }
            ui.text("Uniforms");
            for uniform in reflection.uniforms() {
                let ty = uniform.ty.glsl_name();
                let value = if uniform.array_size > 1 {
                    format!("{ty}[{}]", uniform.array_size)
                } else {
                    ty.to_string()
                };
                ui.label_value(&uniform.name, &value);
            }
            ui.separator();
            ui.label_value("Blend", &format!("{:?}", shader.blend()));
            ui.label_value("Depth test", &shader.depth_test().to_string());
            ui.label_value("Depth write", &shader.depth_write().to_string());
            let offset = shader.polygon_offset();
            ui.label_value(
                "Polygon offset",
                &format!("factor {}, units {}", offset.factor, offset.units),
            );
            if ui.button("Edit") {
                self.edit_shader(shader);
            }

            let angle = self.preview_angle();
            match self.previews.render_shader(ctx, shader, angle) {
                Ok(texture) => ui.image(&ImageDesc::new(texture.handle(), self.preview_size())),
                Err(err) => ui.error_text(&format!("Preview failed: {err}")),
            }
        });
    }

    fn texture_node(&self, ui: &mut dyn UiSurface, texture: &Arc<Texture>) {
        let id = format!("texture-{}", texture.id());
        ui.tree_node(&id, texture.name(), &mut |ui| {
            ui.label_value("Size", &format!("{}x{}", texture.width(), texture.height()));
            ui.label_value("Format", &format!("{:?}", texture.format()));
            ui.label_value("Cubemap", &texture.is_cubemap().to_string());
            ui.label_value("Linear filtering", &texture.is_filter_linear().to_string());
            ui.label_value("Mipmaps", &texture.has_mipmaps().to_string());
            ui.label_value("Wrap", &format!("{:?}", texture.wrap()));
            ui.label_value("Memory", &format!("{:.1} KB", texture.data_size() as f32 / 1024.0));
            if !texture.is_cubemap() && !texture.is_depth() {
                let display = self.config.preview_display_size;
                let aspect = texture.width() as f32 / texture.height() as f32;
                let size = if aspect >= 1.0 {
                    Vec2::new(display, display / aspect)
                } else {
                    Vec2::new(display * aspect, display)
                };
                ui.image(&ImageDesc::new(texture.handle(), size).with_border([0.5, 0.5, 0.5, 1.0]));
            }
        });
    }

    fn mesh_node<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        ui: &mut dyn UiSurface,
        mesh: &Arc<Mesh>,
    ) {
        let id = format!("mesh-{}", mesh.id());
        ui.tree_node(&id, mesh.name(), &mut |ui| {
            ui.label_value("Vertices", &mesh.vertex_count().to_string());
            ui.label_value("Topology", &format!("{:?}", mesh.topology()));
            ui.label_value("Memory", &format!("{:.1} KB", mesh.data_size() as f32 / 1024.0));
            ui.text("Attributes");
            for attribute in mesh.attributes() {
                ui.label_value(&attribute.name, &format!("{:?}", attribute.format));
            }
            for (index, set) in mesh.index_sets().iter().enumerate() {
                ui.label_value(&format!("Index set {index}"), &format!("{} indices", set.count));
            }

            let angle = self.preview_angle();
            match self.previews.render_mesh(ctx, mesh, angle) {
                Ok(texture) => ui.image(&ImageDesc::new(texture.handle(), self.preview_size())),
                Err(err) => ui.error_text(&format!("Preview failed: {err}")),
            }
        });
    }

    fn sprite_atlas_node(&mut self, ui: &mut dyn UiSurface, atlas: &Arc<SpriteAtlas>) {
        let id = format!("atlas-{}", atlas.id());
        let display = self.config.preview_display_size;
        let selected = self.sprite_selection.entry(atlas.id()).or_insert(None);
        ui.tree_node(&id, atlas.name(), &mut |ui| {
            let names: Vec<String> = atlas.names().map(str::to_string).collect();
            if selected.is_none() && !names.is_empty() {
                *selected = Some(0);
            }
            ui.combo("Sprite", &names, selected);

            let Some(sprite) = selected.and_then(|i| atlas.sprite_at(i)) else {
                ui.text("No sprites");
                return;
            };
            let position = sprite.position();
            let size = sprite.size();
            let anchor = sprite.anchor();
            ui.label_value("Position", &format!("{}, {}", position.x, position.y));
            ui.label_value("Size", &format!("{}x{}", size.x, size.y));
            ui.label_value("Anchor", &format!("{:.2}, {:.2}", anchor.x, anchor.y));

            let (uv_min, uv_max) = sprite.uv_rect();
            let scale = display / size.x.max(size.y).max(1) as f32;
            let image = ImageDesc::new(sprite.texture().handle(), size.as_vec2() * scale)
                .with_uv(uv_min, uv_max)
                .with_border([0.5, 0.5, 0.5, 1.0]);
            ui.image(&image);
        });
    }
}

fn framebuffer_node(ui: &mut dyn UiSurface, framebuffer: &Arc<Framebuffer>) {
    let id = format!("framebuffer-{}", framebuffer.id());
    ui.tree_node(&id, framebuffer.name(), &mut |ui| {
        let (width, height) = framebuffer.size();
        ui.label_value("Size", &format!("{width}x{height}"));
        ui.label_value("Color targets", &framebuffer.color_texture_count().to_string());
        ui.label_value(
            "Depth target",
            &framebuffer.depth_texture().is_some().to_string(),
        );
    });
}
