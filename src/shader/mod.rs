//! Shaders: compiled GPU programs with reflected attributes and uniforms.
//!
//! A [`Shader`] is created through
//! [`RenderContext::create_shader`](crate::render::RenderContext::create_shader)
//! from a [`ShaderDescriptor`]. It keeps its stage sources so that it can be
//! recompiled in place; the program handle, reflection and sources are swapped
//! together under one write lock, so readers never observe a reflection that
//! does not belong to the bound program.
//!
//! # Example
//!
//! ```ignore
//! let shader = ctx.create_shader(
//!     ShaderDescriptor::new("flat")
//!         .with_vertex(VERTEX_SOURCE)
//!         .with_fragment(FRAGMENT_SOURCE)
//!         .with_blend(BlendMode::AlphaBlending),
//! )?;
//! let mut material = shader.create_material();
//! material.set("color", Vec4::new(1.0, 0.0, 0.0, 1.0))?;
//! ```

pub mod compiler;
pub mod library;
pub mod preprocess;
pub mod reflection;
pub mod uniform;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{BlendMode, PipelineState, PolygonOffset, ProgramHandle, Topology};
use crate::resources::release::{PendingRelease, ReleaseQueue};
use crate::resources::{next_resource_id, Material};

pub use compiler::{compile_program, CompiledProgram};
pub use library::ShaderLibrary;
pub use preprocess::ShaderPreprocessor;
pub use reflection::{
    AttributeInfo, AttributeType, ShaderReflection, UniformBlockInfo, UniformInfo,
    UniformLocation, ENGINE_GLOBAL_PREFIX,
};
pub use uniform::{UniformType, UniformValue};

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::Geometry,
        ShaderStage::TessControl,
        ShaderStage::TessEvaluation,
    ];

    /// Macro defined while preprocessing this stage.
    pub fn define(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
            ShaderStage::Geometry => "GEOMETRY",
            ShaderStage::TessControl => "TESS_CONTROL",
            ShaderStage::TessEvaluation => "TESS_EVALUATION",
        }
    }

    pub(crate) fn naga_stage(&self) -> Option<naga::ShaderStage> {
        match self {
            ShaderStage::Vertex => Some(naga::ShaderStage::Vertex),
            ShaderStage::Fragment => Some(naga::ShaderStage::Fragment),
            ShaderStage::Geometry | ShaderStage::TessControl | ShaderStage::TessEvaluation => {
                None
            }
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Fragment => "Fragment",
            ShaderStage::Geometry => "Geometry",
            ShaderStage::TessControl => "Tessellation control",
            ShaderStage::TessEvaluation => "Tessellation evaluation",
        };
        f.write_str(name)
    }
}

/// Shaders the render context can build on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultShader {
    /// Phong lit with `color`, `tex` and `specularity`
    Standard,
    /// `color` times `tex`
    Unlit,
    /// Vertex color times `tex`, alpha blended, no depth writes
    UnlitSprite,
    /// Texture coordinates as color
    DebugUv,
    /// World normals as color
    DebugNormals,
}

impl DefaultShader {
    pub fn name(&self) -> &'static str {
        match self {
            DefaultShader::Standard => "Standard",
            DefaultShader::Unlit => "Unlit",
            DefaultShader::UnlitSprite => "UnlitSprite",
            DefaultShader::DebugUv => "DebugUV",
            DefaultShader::DebugNormals => "DebugNormals",
        }
    }

    pub fn descriptor(&self) -> ShaderDescriptor {
        let (vertex, fragment) = match self {
            DefaultShader::Standard => (library::STANDARD_VERTEX, library::STANDARD_FRAGMENT),
            DefaultShader::Unlit => (library::UNLIT_VERTEX, library::UNLIT_FRAGMENT),
            DefaultShader::UnlitSprite => {
                (library::UNLIT_SPRITE_VERTEX, library::UNLIT_SPRITE_FRAGMENT)
            }
            DefaultShader::DebugUv => (library::UNLIT_VERTEX, library::DEBUG_UV_FRAGMENT),
            DefaultShader::DebugNormals => {
                (library::STANDARD_VERTEX, library::DEBUG_NORMALS_FRAGMENT)
            }
        };
        let descriptor = ShaderDescriptor::new(self.name())
            .with_vertex(vertex)
            .with_fragment(fragment);
        match self {
            DefaultShader::UnlitSprite => descriptor
                .with_depth_write(false)
                .with_blend(BlendMode::AlphaBlending),
            _ => descriptor,
        }
    }
}

/// Configuration for building a [`Shader`].
#[derive(Debug, Clone)]
pub struct ShaderDescriptor {
    pub name: String,
    pub sources: BTreeMap<ShaderStage, String>,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
    pub polygon_offset: PolygonOffset,
}

impl ShaderDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: BTreeMap::new(),
            depth_test: true,
            depth_write: true,
            blend: BlendMode::Disabled,
            polygon_offset: PolygonOffset::default(),
        }
    }

    pub fn with_source(mut self, stage: ShaderStage, source: impl Into<String>) -> Self {
        self.sources.insert(stage, source.into());
        self
    }

    pub fn with_vertex(self, source: impl Into<String>) -> Self {
        self.with_source(ShaderStage::Vertex, source)
    }

    pub fn with_fragment(self, source: impl Into<String>) -> Self {
        self.with_source(ShaderStage::Fragment, source)
    }

    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn with_depth_write(mut self, enabled: bool) -> Self {
        self.depth_write = enabled;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_polygon_offset(mut self, factor: f32, units: f32) -> Self {
        self.polygon_offset = PolygonOffset { factor, units };
        self
    }
}

/// The currently linked program with the reflection and sources it was built from.
#[derive(Debug, Clone)]
pub struct ProgramState {
    pub program: ProgramHandle,
    pub reflection: Arc<ShaderReflection>,
    pub sources: BTreeMap<ShaderStage, String>,
    /// Bumped on each successful recompile
    pub generation: u64,
}

/// A compiled GPU program plus the fixed-function state used with it.
pub struct Shader {
    id: u64,
    name: String,
    state: RwLock<ProgramState>,
    depth_test: bool,
    depth_write: bool,
    blend: BlendMode,
    polygon_offset: PolygonOffset,
    release: ReleaseQueue,
}

impl Shader {
    pub(crate) fn new(
        descriptor: &ShaderDescriptor,
        program: ProgramHandle,
        reflection: ShaderReflection,
        release: ReleaseQueue,
    ) -> Self {
        Self {
            id: next_resource_id(),
            name: descriptor.name.clone(),
            state: RwLock::new(ProgramState {
                program,
                reflection: Arc::new(reflection),
                sources: descriptor.sources.clone(),
                generation: 0,
            }),
            depth_test: descriptor.depth_test,
            depth_write: descriptor.depth_write,
            blend: descriptor.blend,
            polygon_offset: descriptor.polygon_offset,
            release,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the linked program, reflection and sources.
    pub fn program_state(&self) -> ProgramState {
        self.state.read().clone()
    }

    pub fn program(&self) -> ProgramHandle {
        self.state.read().program
    }

    pub fn reflection(&self) -> Arc<ShaderReflection> {
        self.state.read().reflection.clone()
    }

    pub fn sources(&self) -> BTreeMap<ShaderStage, String> {
        self.state.read().sources.clone()
    }

    pub fn source(&self, stage: ShaderStage) -> Option<String> {
        self.state.read().sources.get(&stage).cloned()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Program, reflection and generation read under one lock.
    pub(crate) fn linked(&self) -> (ProgramHandle, Arc<ShaderReflection>, u64) {
        let state = self.state.read();
        (state.program, state.reflection.clone(), state.generation)
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn polygon_offset(&self) -> PolygonOffset {
        self.polygon_offset
    }

    pub(crate) fn pipeline_state(&self, topology: Topology) -> PipelineState {
        PipelineState {
            depth_test: self.depth_test,
            depth_write: self.depth_write,
            blend: self.blend,
            polygon_offset: self.polygon_offset,
            topology,
        }
    }

    /// Create a zero-initialized material for this shader.
    pub fn create_material(self: &Arc<Self>) -> Material {
        Material::new(self.clone())
    }

    /// Swap in a freshly linked program. The previous program is queued for release.
    pub(crate) fn replace_program(
        &self,
        program: ProgramHandle,
        reflection: ShaderReflection,
        sources: BTreeMap<ShaderStage, String>,
    ) {
        let mut state = self.state.write();
        let previous = state.program;
        state.program = program;
        state.reflection = Arc::new(reflection);
        state.sources = sources;
        state.generation += 1;
        drop(state);
        self.release.push(PendingRelease::Program(previous));
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("program", &self.program())
            .finish()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.release
            .push(PendingRelease::Program(self.state.get_mut().program));
    }
}
