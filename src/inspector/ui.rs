//! Immediate-mode UI surface the inspector draws through.
//!
//! The inspector never talks to a UI library directly.
//! [`EguiSurface`](crate::inspector::EguiSurface) adapts `egui`; tests use recorders.

use glam::Vec2;

use crate::backend::TextureHandle;

/// An image widget showing part of a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDesc {
    pub texture: TextureHandle,
    /// Size on screen in points
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    /// RGBA multiplier
    pub tint: [f32; 4],
    /// RGBA color of a one point frame, none when `None`
    pub border: Option<[f32; 4]>,
}

impl ImageDesc {
    pub fn new(texture: TextureHandle, size: Vec2) -> Self {
        Self {
            texture,
            size,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            tint: [1.0; 4],
            border: None,
        }
    }

    pub fn with_uv(mut self, uv_min: Vec2, uv_max: Vec2) -> Self {
        self.uv_min = uv_min;
        self.uv_max = uv_max;
        self
    }

    pub fn with_border(mut self, color: [f32; 4]) -> Self {
        self.border = Some(color);
        self
    }
}

/// Widgets the inspector needs. Container widgets take their contents as a
/// callback that receives the nested surface.
pub trait UiSurface {
    /// Floating window. Clearing `open` closes it.
    fn window(
        &mut self,
        title: &str,
        open: &mut bool,
        size: Option<Vec2>,
        add_contents: &mut dyn FnMut(&mut dyn UiSurface),
    );

    /// Top-level section, open by default.
    fn collapsing_header(&mut self, label: &str, add_contents: &mut dyn FnMut(&mut dyn UiSurface));

    /// Collapsed entry, identified by `id` so equal labels do not clash.
    fn tree_node(
        &mut self,
        id: &str,
        label: &str,
        add_contents: &mut dyn FnMut(&mut dyn UiSurface),
    );

    /// `label: value` row.
    fn label_value(&mut self, label: &str, value: &str);

    fn text(&mut self, text: &str);

    /// Text drawn in the error color.
    fn error_text(&mut self, text: &str);

    fn separator(&mut self);

    /// Returns true when clicked.
    fn button(&mut self, label: &str) -> bool;

    /// Returns true when toggled.
    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool;

    /// Returns true when the selection changed.
    fn combo(&mut self, label: &str, items: &[String], selected: &mut Option<usize>) -> bool;

    fn image(&mut self, image: &ImageDesc);

    /// Line plot of `values` scaled into `range`.
    fn plot_lines(&mut self, label: &str, values: &[f32], range: (f32, f32), size: Vec2);

    fn code_editor(&mut self, editor: &mut dyn CodeEditor, size: Vec2);
}

/// Syntax mode of a code editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    PlainText,
    #[default]
    Glsl,
}

/// Color scheme of a code editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    Dark,
    Light,
}

/// Editable text buffer shown by [`UiSurface::code_editor`].
pub trait CodeEditor {
    fn text(&self) -> &str;

    fn text_mut(&mut self) -> &mut String;

    fn set_text(&mut self, text: &str);

    fn is_read_only(&self) -> bool;

    fn set_read_only(&mut self, read_only: bool);

    fn language(&self) -> Language;

    fn set_language(&mut self, language: Language);

    fn palette(&self) -> Palette;

    fn set_palette(&mut self, palette: Palette);
}

/// Default [`CodeEditor`]: a plain string with flags.
#[derive(Debug, Clone, Default)]
pub struct PlainTextEditor {
    text: String,
    read_only: bool,
    language: Language,
    palette: Palette,
}

impl PlainTextEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

impl CodeEditor for PlainTextEditor {
    fn text(&self) -> &str {
        &self.text
    }

    fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn language(&self) -> Language {
        self.language
    }

    fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    fn palette(&self) -> Palette {
        self.palette
    }

    fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }
}
