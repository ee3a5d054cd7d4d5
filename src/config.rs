//! Configuration for the render context and the inspector

/// Configuration for creating a [`RenderContext`](crate::render::RenderContext)
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Number of frames kept in the context's frame history
    pub stats_window: usize,
    /// Clear color used by passes that do not set their own
    pub clear_color: [f32; 4],
    /// Extra `#define NAME VALUE` lines injected into every shader stage
    pub defines: Vec<(String, String)>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            stats_window: 60,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            defines: Vec::new(),
        }
    }
}

impl RenderConfig {
    pub fn with_stats_window(mut self, frames: usize) -> Self {
        self.stats_window = frames;
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }
}

/// Configuration for the [`Inspector`](crate::inspector::Inspector)
#[derive(Debug, Clone)]
pub struct InspectorConfig {
    /// Number of frames shown in the trend plots
    pub frames: usize,
    /// Edge length in pixels of the preview render targets
    pub preview_texture_size: u32,
    /// Edge length in points of previews in the UI
    pub preview_display_size: f32,
    /// Preview rotation in radians per second
    pub rotation_speed: f32,
    /// Size in points of the shader editor
    pub editor_size: [f32; 2],
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            frames: 60,
            preview_texture_size: 256,
            preview_display_size: 128.0,
            rotation_speed: 1.0,
            editor_size: [600.0, 400.0],
        }
    }
}

impl InspectorConfig {
    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_preview_texture_size(mut self, size: u32) -> Self {
        self.preview_texture_size = size;
        self
    }

    pub fn with_preview_display_size(mut self, size: f32) -> Self {
        self.preview_display_size = size;
        self
    }

    pub fn with_rotation_speed(mut self, radians_per_second: f32) -> Self {
        self.rotation_speed = radians_per_second;
        self
    }

    pub fn with_editor_size(mut self, width: f32, height: f32) -> Self {
        self.editor_size = [width, height];
        self
    }
}
