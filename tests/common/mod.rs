//! Shared helpers for the integration tests.
//!
//! Provides a logging setup, small GLSL test shaders, resource builders for
//! the dummy backend and a [`RecordingSurface`] that stands in for a real UI.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};

use simple_render_engine::backend::{BackendCommand, DummyBackend};
use simple_render_engine::inspector::{CodeEditor, ImageDesc, Palette, UiSurface};
use simple_render_engine::{
    Mesh, MeshDescriptor, RenderContext, Shader, ShaderDescriptor, Texture, TextureDescriptor,
};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Shaders
// ============================================================================

/// Position-only vertex stage using the engine globals.
pub const COLOR_VERTEX: &str = r#"#version 450
#include "engine/globals.glsl"
layout(location = 0) in vec3 position;
void main() {
    gl_Position = g_projection * g_view * g_model * vec4(position, 1.0);
}
"#;

/// Flat `color` from the material block.
pub const COLOR_FRAGMENT: &str = r#"#version 450
layout(set = 0, binding = 1) uniform Material {
    vec4 color;
};
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = color;
}
"#;

/// Flat `tint`, a second material layout for shader-change tests.
pub const TINT_FRAGMENT: &str = r#"#version 450
layout(set = 0, binding = 1) uniform Material {
    vec4 tint;
    float strength;
};
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = tint * strength;
}
"#;

/// Does not parse.
pub const BROKEN_FRAGMENT: &str = r#"#version 450
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(1.0) +;
}
"#;

pub fn color_shader_descriptor(name: &str) -> ShaderDescriptor {
    ShaderDescriptor::new(name)
        .with_vertex(COLOR_VERTEX)
        .with_fragment(COLOR_FRAGMENT)
}

pub fn tint_shader_descriptor(name: &str) -> ShaderDescriptor {
    ShaderDescriptor::new(name)
        .with_vertex(COLOR_VERTEX)
        .with_fragment(TINT_FRAGMENT)
}

// ============================================================================
// Context and resources
// ============================================================================

pub fn dummy_context() -> RenderContext<DummyBackend> {
    init_logging();
    RenderContext::new(DummyBackend::with_surface_size(800, 600))
}

pub fn color_shader(ctx: &mut RenderContext<DummyBackend>) -> Arc<Shader> {
    ctx.create_shader(color_shader_descriptor("color"))
        .expect("color shader compiles")
}

/// A single triangle without index sets.
pub fn triangle(ctx: &mut RenderContext<DummyBackend>) -> Arc<Mesh> {
    ctx.create_mesh(MeshDescriptor::new("triangle").with_positions(vec![
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(-0.5, -0.5, 0.0),
        Vec3::new(0.5, -0.5, 0.0),
    ]))
    .expect("triangle mesh")
}

/// A quad split into two index sets of one triangle each.
pub fn split_quad(ctx: &mut RenderContext<DummyBackend>) -> Arc<Mesh> {
    ctx.create_mesh(
        MeshDescriptor::new("split quad")
            .with_positions(vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ])
            .with_uvs(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ])
            .with_index_set(vec![0, 1, 2])
            .with_index_set(vec![0, 2, 3]),
    )
    .expect("split quad mesh")
}

pub fn checker_texture(ctx: &mut RenderContext<DummyBackend>, size: u32) -> Arc<Texture> {
    ctx.create_texture(
        TextureDescriptor::checkerboard(size, [255, 255, 255, 255], [0, 0, 0, 255])
            .with_name("checker"),
    )
    .expect("checker texture")
}

/// Commands between the last `BeginRenderPass` and its `EndRenderPass`.
pub fn last_pass_commands(backend: &DummyBackend) -> Vec<BackendCommand> {
    let commands = backend.commands();
    let start = commands
        .iter()
        .rposition(|c| matches!(c, BackendCommand::BeginRenderPass(_)))
        .map(|i| i + 1)
        .unwrap_or(0);
    commands[start..]
        .iter()
        .take_while(|c| !matches!(c, BackendCommand::EndRenderPass))
        .cloned()
        .collect()
}

pub fn approx_eq(a: Vec4, b: Vec4) -> bool {
    (a - b).abs().max_element() < 1e-5
}

// ============================================================================
// Recording UI surface
// ============================================================================

/// Widget calls seen by a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Window(String),
    Header(String),
    TreeNode(String),
    LabelValue(String, String),
    Text(String),
    Error(String),
    Separator,
    Button(String),
    Checkbox(String, bool),
    Combo(String, Vec<String>, Option<usize>),
    Image(ImageDesc),
    Plot(String, usize),
    CodeEditor {
        text: String,
        read_only: bool,
        palette: Palette,
    },
}

/// A [`UiSurface`] that expands every container and records each widget.
///
/// Interactions are scripted up front: buttons listed in `clicks` report a
/// click every time they are drawn, windows in `close` are closed, and
/// checkboxes and combos take the values in `checks` and `selections`.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub events: Vec<UiEvent>,
    pub clicks: HashSet<String>,
    pub close: HashSet<String>,
    pub checks: HashMap<String, bool>,
    pub selections: HashMap<String, usize>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicking(mut self, label: &str) -> Self {
        self.clicks.insert(label.to_string());
        self
    }

    pub fn closing(mut self, title: &str) -> Self {
        self.close.insert(title.to_string());
        self
    }

    pub fn checking(mut self, label: &str, value: bool) -> Self {
        self.checks.insert(label.to_string(), value);
        self
    }

    pub fn selecting(mut self, label: &str, index: usize) -> Self {
        self.selections.insert(label.to_string(), index);
        self
    }

    pub fn windows(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Window(title) => Some(title.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Header(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tree_nodes(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::TreeNode(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn images(&self) -> Vec<ImageDesc> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Image(image) => Some(*image),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.events.iter().find_map(|e| match e {
            UiEvent::LabelValue(l, value) if l == label => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn plots(&self) -> Vec<(&str, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Plot(label, count) => Some((label.as_str(), *count)),
                _ => None,
            })
            .collect()
    }

    pub fn last_code_editor(&self) -> Option<(&str, bool, Palette)> {
        self.events.iter().rev().find_map(|e| match e {
            UiEvent::CodeEditor {
                text,
                read_only,
                palette,
            } => Some((text.as_str(), *read_only, *palette)),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl UiSurface for RecordingSurface {
    fn window(
        &mut self,
        title: &str,
        open: &mut bool,
        _size: Option<Vec2>,
        add_contents: &mut dyn FnMut(&mut dyn UiSurface),
    ) {
        self.events.push(UiEvent::Window(title.to_string()));
        if self.close.contains(title) {
            *open = false;
            return;
        }
        add_contents(self);
    }

    fn collapsing_header(&mut self, label: &str, add_contents: &mut dyn FnMut(&mut dyn UiSurface)) {
        self.events.push(UiEvent::Header(label.to_string()));
        add_contents(self);
    }

    fn tree_node(
        &mut self,
        _id: &str,
        label: &str,
        add_contents: &mut dyn FnMut(&mut dyn UiSurface),
    ) {
        self.events.push(UiEvent::TreeNode(label.to_string()));
        add_contents(self);
    }

    fn label_value(&mut self, label: &str, value: &str) {
        self.events
            .push(UiEvent::LabelValue(label.to_string(), value.to_string()));
    }

    fn text(&mut self, text: &str) {
        self.events.push(UiEvent::Text(text.to_string()));
    }

    fn error_text(&mut self, text: &str) {
        self.events.push(UiEvent::Error(text.to_string()));
    }

    fn separator(&mut self) {
        self.events.push(UiEvent::Separator);
    }

    fn button(&mut self, label: &str) -> bool {
        self.events.push(UiEvent::Button(label.to_string()));
        self.clicks.contains(label)
    }

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
        let changed = match self.checks.get(label) {
            Some(wanted) if *wanted != *value => {
                *value = *wanted;
                true
            }
            _ => false,
        };
        self.events.push(UiEvent::Checkbox(label.to_string(), *value));
        changed
    }

    fn combo(&mut self, label: &str, items: &[String], selected: &mut Option<usize>) -> bool {
        let changed = match self.selections.get(label) {
            Some(index) if *index < items.len() && *selected != Some(*index) => {
                *selected = Some(*index);
                true
            }
            _ => false,
        };
        self.events
            .push(UiEvent::Combo(label.to_string(), items.to_vec(), *selected));
        changed
    }

    fn image(&mut self, image: &ImageDesc) {
        self.events.push(UiEvent::Image(*image));
    }

    fn plot_lines(&mut self, label: &str, values: &[f32], _range: (f32, f32), _size: Vec2) {
        self.events.push(UiEvent::Plot(label.to_string(), values.len()));
    }

    fn code_editor(&mut self, editor: &mut dyn CodeEditor, _size: Vec2) {
        self.events.push(UiEvent::CodeEditor {
            text: editor.text().to_string(),
            read_only: editor.is_read_only(),
            palette: editor.palette(),
        });
    }
}
