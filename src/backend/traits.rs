//! Core backend abstraction trait
//!
//! The render core issues all GPU work through [`GraphicsBackend`]. Calls are
//! made in submission order; a backend may buffer them until
//! [`GraphicsBackend::end_render_pass`].

use std::ops::Range;

use crate::backend::types::*;
use crate::error::BackendResult;

/// Main graphics backend trait
pub trait GraphicsBackend {
    /// Human readable backend name
    fn name(&self) -> &str;

    /// Size of the default (screen) target
    fn surface_size(&self) -> (u32, u32);

    // Resource creation

    /// Link a program from compiled stages
    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle>;

    /// Create a buffer with initial data
    fn create_buffer_init(
        &mut self,
        desc: &GpuBufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle>;

    /// Create a texture
    fn create_texture(&mut self, desc: &GpuTextureDescriptor) -> BackendResult<TextureHandle>;

    /// Upload the base level of one layer (cubemap face or 0)
    fn write_texture(&mut self, texture: TextureHandle, layer: u32, data: &[u8]);

    // Command recording

    /// Begin a render pass
    fn begin_render_pass(&mut self, desc: &PassDescriptor);

    /// End the current render pass
    fn end_render_pass(&mut self);

    /// Bind a program for the following draws
    fn set_program(&mut self, program: ProgramHandle);

    /// Set depth, blend, offset and topology state
    fn set_pipeline_state(&mut self, state: &PipelineState);

    /// Replace the contents of a uniform block for the next draw
    fn set_uniform_block(&mut self, group: u32, binding: u32, data: &[u8]);

    /// Bind a texture; `None` binds the backend's fallback texture
    fn set_texture(&mut self, layout: &TextureLayout, texture: Option<TextureHandle>);

    /// Bind an attribute buffer; `None` feeds zeros to the attribute
    fn set_vertex_buffer(
        &mut self,
        location: u32,
        buffer: Option<BufferHandle>,
        format: VertexFormat,
    );

    /// Bind a `u32` index buffer
    fn set_index_buffer(&mut self, buffer: BufferHandle);

    /// Draw primitives
    fn draw(&mut self, vertices: Range<u32>);

    /// Draw indexed primitives
    fn draw_indexed(&mut self, indices: Range<u32>);

    // Resource cleanup

    /// Destroy a program
    fn destroy_program(&mut self, program: ProgramHandle);

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureHandle);
}
