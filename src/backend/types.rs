//! Common types shared between backends

use crate::shader::ShaderStage;

/// Handle to a linked GPU program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub(crate) u64);

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u64);

impl ProgramHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl BufferHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl TextureHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    R8Unorm,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// GPU-side texture allocation request
#[derive(Debug, Clone, PartialEq)]
pub struct GpuTextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub cubemap: bool,
    pub mip_levels: u32,
    pub filter_linear: bool,
    pub wrap: WrapMode,
    pub render_target: bool,
}

impl GpuTextureDescriptor {
    pub fn layers(&self) -> u32 {
        if self.cubemap {
            6
        } else {
            1
        }
    }
}

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// GPU-side buffer allocation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuBufferDescriptor {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
}

impl VertexFormat {
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32 | VertexFormat::Sint32 => 4,
            VertexFormat::Float32x2 | VertexFormat::Sint32x2 => 8,
            VertexFormat::Float32x3 | VertexFormat::Sint32x3 => 12,
            VertexFormat::Float32x4 | VertexFormat::Sint32x4 => 16,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            VertexFormat::Sint32
                | VertexFormat::Sint32x2
                | VertexFormat::Sint32x3
                | VertexFormat::Sint32x4
        )
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// Blend mode applied to every draw of a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Disabled,
    AlphaBlending,
    AdditiveBlending,
}

/// Depth bias applied while rasterizing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolygonOffset {
    pub factor: f32,
    pub units: f32,
}

impl PolygonOffset {
    pub fn is_enabled(&self) -> bool {
        self.factor != 0.0 || self.units != 0.0
    }
}

/// Fixed-function state for the next draws
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
    pub polygon_offset: PolygonOffset,
    pub topology: Topology,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            blend: BlendMode::Disabled,
            polygon_offset: PolygonOffset::default(),
            topology: Topology::Triangles,
        }
    }
}

/// Uniform block binding needed by a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub group: u32,
    pub binding: u32,
    pub size: u32,
}

/// Sampled texture binding needed by a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureLayout {
    pub group: u32,
    pub binding: u32,
    pub sampler_binding: Option<u32>,
    pub cubemap: bool,
}

/// Vertex input needed by a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    pub location: u32,
    pub format: VertexFormat,
}

/// A preprocessed stage, with its WGSL translation when one could be produced
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub glsl: String,
    pub wgsl: Option<String>,
}

/// Everything a backend needs to link a program
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDescriptor {
    pub label: String,
    pub stages: Vec<CompiledStage>,
    pub blocks: Vec<BlockLayout>,
    pub textures: Vec<TextureLayout>,
    pub attributes: Vec<AttributeLayout>,
}

/// Output of a render pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassTarget {
    Screen,
    Textures {
        colors: Vec<TextureHandle>,
        depth: Option<TextureHandle>,
        width: u32,
        height: u32,
    },
}

/// Render pass descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    pub label: String,
    pub target: PassTarget,
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: bool,
}
