//! Live shader editing session

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use glam::Vec2;

use crate::backend::GraphicsBackend;
use crate::inspector::ui::{CodeEditor, Language, Palette, PlainTextEditor, UiSurface};
use crate::render::RenderContext;
use crate::shader::{Shader, ShaderStage};

/// Edited copies of a shader's stage sources.
///
/// Holds the shader weakly; the session ends when its window is closed or
/// the shader is dropped.
pub(crate) struct ShaderEditorSession {
    shader: Weak<Shader>,
    title: String,
    stages: Vec<ShaderStage>,
    sources: Vec<String>,
    stage_index: usize,
    show_precompiled: bool,
    errors: Option<String>,
    editor: Box<dyn CodeEditor>,
}

impl ShaderEditorSession {
    pub fn open(shader: &Arc<Shader>) -> Self {
        let (stages, sources): (Vec<_>, Vec<_>) = shader.sources().into_iter().unzip();
        let mut editor = PlainTextEditor::new(sources.first().cloned().unwrap_or_default());
        editor.set_language(Language::Glsl);
        log::debug!("Editing shader '{}'", shader.name());

        Self {
            shader: Arc::downgrade(shader),
            title: format!("Edit shader '{}'", shader.name()),
            stages,
            sources,
            stage_index: 0,
            show_precompiled: false,
            errors: None,
            editor: Box::new(editor),
        }
    }

    pub fn shader(&self) -> Option<Arc<Shader>> {
        self.shader.upgrade()
    }

    pub fn is_for(&self, shader: &Arc<Shader>) -> bool {
        Weak::ptr_eq(&self.shader, &Arc::downgrade(shader))
    }

    pub fn current_stage(&self) -> Option<ShaderStage> {
        self.stages.get(self.stage_index).copied()
    }

    pub fn errors(&self) -> Option<&str> {
        self.errors.as_deref()
    }

    pub fn editor(&self) -> &dyn CodeEditor {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> &mut dyn CodeEditor {
        self.editor.as_mut()
    }

    /// All stages with the editor's text folded in.
    pub fn edited_sources(&mut self) -> BTreeMap<ShaderStage, String> {
        self.save_editor_text();
        self.stages
            .iter()
            .copied()
            .zip(self.sources.iter().cloned())
            .collect()
    }

    /// Draw the editor window. Returns false once the session should end.
    pub fn show<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        ui: &mut dyn UiSurface,
        size: Vec2,
    ) -> bool {
        let Some(shader) = self.shader() else {
            log::debug!("Shader of '{}' was dropped; closing editor", self.title);
            return false;
        };

        let mut open = true;
        let title = self.title.clone();
        ui.window(&title, &mut open, Some(size), &mut |ui| {
            self.contents(ctx, &shader, ui, size);
        });
        open
    }

    fn contents<B: GraphicsBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        shader: &Shader,
        ui: &mut dyn UiSurface,
        size: Vec2,
    ) {
        let names: Vec<String> = self.stages.iter().map(ToString::to_string).collect();
        let mut selected = Some(self.stage_index);
        if ui.combo("Stage", &names, &mut selected) {
            if let Some(index) = selected {
                self.select_stage(ctx, index);
            }
        }

        let mut show_precompiled = self.show_precompiled;
        if ui.checkbox("Show precompiled", &mut show_precompiled) {
            self.set_show_precompiled(ctx, show_precompiled);
        }

        ui.code_editor(self.editor.as_mut(), Vec2::new(size.x, size.y - 80.0));

        if ui.button("Compile") {
            self.compile(ctx, shader);
        }
        if let Some(errors) = &self.errors {
            ui.error_text(errors);
        }
    }

    pub fn select_stage<B: GraphicsBackend>(&mut self, ctx: &RenderContext<B>, index: usize) {
        if index >= self.stages.len() || index == self.stage_index {
            return;
        }
        self.save_editor_text();
        self.stage_index = index;
        self.load_editor_text(ctx);
    }

    pub fn set_show_precompiled<B: GraphicsBackend>(&mut self, ctx: &RenderContext<B>, show: bool) {
        if show == self.show_precompiled {
            return;
        }
        self.save_editor_text();
        self.show_precompiled = show;
        self.load_editor_text(ctx);
    }

    /// Recompile from the edited sources. Errors are kept for display.
    pub fn compile<B: GraphicsBackend>(&mut self, ctx: &mut RenderContext<B>, shader: &Shader) {
        let sources = self.edited_sources();
        match ctx.recompile_shader(shader, sources) {
            Ok(()) => {
                log::info!("Shader '{}' recompiled", shader.name());
                self.errors = None;
            }
            Err(err) => {
                log::error!("Shader '{}' failed to recompile: {err}", shader.name());
                self.errors = Some(err.to_string());
            }
        }
    }

    /// Precompiled text is read-only, so only source text is written back.
    fn save_editor_text(&mut self) {
        if self.show_precompiled {
            return;
        }
        if let Some(source) = self.sources.get_mut(self.stage_index) {
            source.clear();
            source.push_str(self.editor.text());
        }
    }

    fn load_editor_text<B: GraphicsBackend>(&mut self, ctx: &RenderContext<B>) {
        let (Some(stage), Some(source)) = (
            self.stages.get(self.stage_index).copied(),
            self.sources.get(self.stage_index),
        ) else {
            return;
        };
        if self.show_precompiled {
            let text = ctx
                .precompile(source, stage)
                .unwrap_or_else(|err| err.to_string());
            self.editor.set_text(&text);
            self.editor.set_read_only(true);
            self.editor.set_palette(Palette::Light);
        } else {
            self.editor.set_text(source);
            self.editor.set_read_only(false);
            self.editor.set_palette(Palette::Dark);
        }
    }
}
