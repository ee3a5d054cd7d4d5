//! Error types for resource creation, shader compilation, parameter binding and drawing.

use thiserror::Error;

use crate::shader::{ShaderStage, UniformType};

/// Failure reported by a [`GraphicsBackend`](crate::backend::GraphicsBackend).
///
/// Allocation failures surface synchronously from the context factories.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create program: {0}")]
    ProgramCreationFailed(String),
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Invalid handle: {0}")]
    InvalidHandle(u64),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Shader compilation failure.
///
/// A failed compile never allocates a program, and a failed recompile leaves
/// the previous program bound.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Missing required {0} stage")]
    MissingStage(ShaderStage),
    #[error("{stage} preprocessing failed: {message}")]
    Preprocess { stage: ShaderStage, message: String },
    #[error("{stage} compilation failed:\n{message}")]
    Stage { stage: ShaderStage, message: String },
    #[error("Link failed: {message}")]
    Link { message: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CompileError {
    /// The stage the diagnostic refers to, if any.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            CompileError::MissingStage(stage)
            | CompileError::Preprocess { stage, .. }
            | CompileError::Stage { stage, .. } => Some(*stage),
            CompileError::Link { .. } | CompileError::Backend(_) => None,
        }
    }
}

/// Rejected material parameter assignment. The material is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("'{0}' is not an active material uniform")]
    UnknownUniform(String),
    #[error("'{name}' expects {expected:?}, got {found:?}")]
    TypeMismatch {
        name: String,
        expected: UniformType,
        found: UniformType,
    },
    #[error("'{name}' expects {expected} elements, got {found}")]
    ArrayLength {
        name: String,
        expected: u32,
        found: u32,
    },
    #[error("texture slot {slot} of '{name}' is already used by '{other}'")]
    TextureSlotCollision {
        name: String,
        other: String,
        slot: u32,
    },
}

/// A draw request that does not match its mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("mesh '{mesh}' needs {expected} material(s), got {found}")]
    MaterialCountMismatch {
        mesh: String,
        expected: usize,
        found: usize,
    },
}

/// Invalid resource descriptor or failed allocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Umbrella error for callers that do not distinguish failure kinds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type RenderResult<T> = Result<T, RenderError>;
