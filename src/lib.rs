//! Simple Render Engine - render resource and pass management with a live inspector
//!
//! The engine manages the GPU resources of a small real-time renderer and
//! sequences draw calls through a backend-neutral [`GraphicsBackend`]:
//! - **DummyBackend**: records every command, no GPU required (always built)
//! - **WgpuBackend**: headless `wgpu` rendering (`wgpu-backend` feature)
//!
//! # Features
//! - GLSL shaders with `#include` support, validated and reflected by naga
//! - Materials as typed uniform sets with std140 packing
//! - Meshes with multiple index sets, textures, cubemaps, framebuffers and sprite atlases
//! - Render passes with shader/material/mesh state-change tracking and per-frame statistics
//! - An inspector listing live resources with previews, trend plots and a live shader editor
//!
//! # Example
//!
//! ```ignore
//! let mut ctx = RenderContext::new(DummyBackend::new());
//! let shader = ctx.default_shader(DefaultShader::Unlit)?;
//! let mesh = ctx.create_mesh(MeshDescriptor::cube())?;
//! let mut material = shader.create_material();
//! material.set("color", Vec4::new(1.0, 0.5, 0.0, 1.0))?;
//!
//! let mut pass = ctx.render_pass(RenderPassDescriptor::new("main"));
//! pass.draw(&mesh, Mat4::IDENTITY, &[&material])?;
//! pass.finish();
//! let stats = ctx.end_frame();
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod inspector;
pub mod render;
pub mod resources;
pub mod scene;
pub mod shader;

pub use backend::{DummyBackend, GraphicsBackend};
#[cfg(feature = "wgpu-backend")]
pub use backend::WgpuBackend;
pub use config::{InspectorConfig, RenderConfig};
pub use error::{
    BackendError, BindError, CompileError, DrawError, RenderError, RenderResult, ResourceError,
};
pub use inspector::Inspector;
pub use render::{
    FrameStatistics, Metric, RenderContext, RenderPass, RenderPassDescriptor, RenderStats,
    RenderTarget,
};
pub use resources::{
    Framebuffer, FramebufferDescriptor, Material, Mesh, MeshDescriptor, Sprite, SpriteAtlas,
    SpriteAtlasDescriptor, SpriteRegion, Texture, TextureDescriptor,
};
pub use scene::{Camera, Light, Projection, WorldLights, MAX_SCENE_LIGHTS};
pub use shader::{
    DefaultShader, Shader, ShaderDescriptor, ShaderStage, UniformType, UniformValue,
};
