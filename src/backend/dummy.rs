//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out handles,
//! tracks which objects are alive and records every command it receives so
//! the draw sequencing can be inspected without GPU hardware.

use std::collections::HashSet;
use std::ops::Range;

use crate::backend::traits::GraphicsBackend;
use crate::backend::types::*;
use crate::error::{BackendError, BackendResult};

/// A command received by the [`DummyBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    BeginRenderPass(PassDescriptor),
    EndRenderPass,
    SetProgram(ProgramHandle),
    SetPipelineState(PipelineState),
    SetUniformBlock {
        group: u32,
        binding: u32,
        data: Vec<u8>,
    },
    SetTexture {
        binding: u32,
        texture: Option<TextureHandle>,
    },
    SetVertexBuffer {
        location: u32,
        buffer: Option<BufferHandle>,
        format: VertexFormat,
    },
    SetIndexBuffer(BufferHandle),
    Draw(Range<u32>),
    DrawIndexed(Range<u32>),
}

impl BackendCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, BackendCommand::Draw(_) | BackendCommand::DrawIndexed(_))
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    surface_size: (u32, u32),
    next_id: u64,
    programs: HashSet<u64>,
    buffers: HashSet<u64>,
    textures: HashSet<u64>,
    commands: Vec<BackendCommand>,
    fail_next_allocation: bool,
    in_pass: bool,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::with_surface_size(1280, 720)
    }

    pub fn with_surface_size(width: u32, height: u32) -> Self {
        Self {
            surface_size: (width, height),
            next_id: 1,
            programs: HashSet::new(),
            buffers: HashSet::new(),
            textures: HashSet::new(),
            commands: Vec::new(),
            fail_next_allocation: false,
            in_pass: false,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    /// Make the next program, buffer or texture allocation fail.
    pub fn fail_next_allocation(&mut self) {
        self.fail_next_allocation = true;
    }

    /// Commands recorded since creation or the last [`Self::clear_commands`].
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn is_program_alive(&self, program: ProgramHandle) -> bool {
        self.programs.contains(&program.0)
    }

    pub fn is_in_pass(&self) -> bool {
        self.in_pass
    }

    fn allocate(&mut self) -> BackendResult<u64> {
        if std::mem::take(&mut self.fail_next_allocation) {
            return Err(BackendError::OutOfMemory);
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    fn record(&mut self, command: BackendCommand) {
        if !self.in_pass {
            log::warn!("DummyBackend: {:?} recorded outside of a render pass", command);
        }
        self.commands.push(command);
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy Backend"
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        let id = self.allocate()?;
        log::trace!(
            "DummyBackend: creating program '{}' ({} stages, {} blocks, {} textures)",
            desc.label,
            desc.stages.len(),
            desc.blocks.len(),
            desc.textures.len()
        );
        self.programs.insert(id);
        Ok(ProgramHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &GpuBufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let id = self.allocate()?;
        log::trace!(
            "DummyBackend: creating buffer '{}' (size: {}, data: {})",
            desc.label,
            desc.size,
            data.len()
        );
        self.buffers.insert(id);
        Ok(BufferHandle(id))
    }

    fn create_texture(&mut self, desc: &GpuTextureDescriptor) -> BackendResult<TextureHandle> {
        let id = self.allocate()?;
        log::trace!(
            "DummyBackend: creating texture '{}' ({}x{}x{})",
            desc.label,
            desc.width,
            desc.height,
            desc.layers()
        );
        self.textures.insert(id);
        Ok(TextureHandle(id))
    }

    fn write_texture(&mut self, texture: TextureHandle, layer: u32, data: &[u8]) {
        log::trace!(
            "DummyBackend: write_texture {:?} layer={} len={}",
            texture,
            layer,
            data.len()
        );
    }

    fn begin_render_pass(&mut self, desc: &PassDescriptor) {
        log::trace!("DummyBackend: begin pass '{}'", desc.label);
        self.in_pass = true;
        self.commands.push(BackendCommand::BeginRenderPass(desc.clone()));
    }

    fn end_render_pass(&mut self) {
        self.commands.push(BackendCommand::EndRenderPass);
        self.in_pass = false;
    }

    fn set_program(&mut self, program: ProgramHandle) {
        self.record(BackendCommand::SetProgram(program));
    }

    fn set_pipeline_state(&mut self, state: &PipelineState) {
        self.record(BackendCommand::SetPipelineState(*state));
    }

    fn set_uniform_block(&mut self, group: u32, binding: u32, data: &[u8]) {
        self.record(BackendCommand::SetUniformBlock {
            group,
            binding,
            data: data.to_vec(),
        });
    }

    fn set_texture(&mut self, layout: &TextureLayout, texture: Option<TextureHandle>) {
        self.record(BackendCommand::SetTexture {
            binding: layout.binding,
            texture,
        });
    }

    fn set_vertex_buffer(
        &mut self,
        location: u32,
        buffer: Option<BufferHandle>,
        format: VertexFormat,
    ) {
        self.record(BackendCommand::SetVertexBuffer {
            location,
            buffer,
            format,
        });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.record(BackendCommand::SetIndexBuffer(buffer));
    }

    fn draw(&mut self, vertices: Range<u32>) {
        self.record(BackendCommand::Draw(vertices));
    }

    fn draw_indexed(&mut self, indices: Range<u32>) {
        self.record(BackendCommand::DrawIndexed(indices));
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        log::trace!("DummyBackend: destroy program {:?}", program);
        self.programs.remove(&program.0);
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
    }
}
