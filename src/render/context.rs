//! The render context: resource factories, registries and frame bookkeeping

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::backend::GraphicsBackend;
use crate::config::RenderConfig;
use crate::error::{CompileError, ResourceError};
use crate::render::{FrameStatistics, RenderPass, RenderPassDescriptor, RenderStats};
use crate::resources::{
    Framebuffer, FramebufferDescriptor, Mesh, MeshDescriptor, Registry, ReleaseQueue,
    SpriteAtlas, SpriteAtlasDescriptor, Texture, TextureDescriptor,
};
use crate::shader::{
    compile_program, DefaultShader, Shader, ShaderDescriptor, ShaderPreprocessor, ShaderStage,
};

/// Owns the backend and every resource created through it.
///
/// Resources are handed out as `Arc`s. The context tracks them weakly in
/// per-kind registries and destroys the GPU objects of dropped resources at
/// [`end_frame`](Self::end_frame) or on the next factory call.
pub struct RenderContext<B: GraphicsBackend> {
    backend: B,
    config: RenderConfig,
    preprocessor: ShaderPreprocessor,
    release: ReleaseQueue,
    shaders: Registry<Shader>,
    textures: Registry<Texture>,
    meshes: Registry<Mesh>,
    framebuffers: Registry<Framebuffer>,
    sprite_atlases: Registry<SpriteAtlas>,
    default_shaders: HashMap<DefaultShader, Arc<Shader>>,
    frame: RenderStats,
    last_frame: RenderStats,
    history: FrameStatistics,
    frame_count: u64,
    last_frame_end: Instant,
}

impl<B: GraphicsBackend> RenderContext<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RenderConfig::default())
    }

    pub fn with_config(backend: B, config: RenderConfig) -> Self {
        let mut preprocessor = ShaderPreprocessor::with_engine_library();
        for (name, value) in &config.defines {
            preprocessor.add_define(name.clone(), value.clone());
        }
        log::info!("Render context created on the {} backend", backend.name());

        Self {
            history: FrameStatistics::new(config.stats_window),
            backend,
            config,
            preprocessor,
            release: ReleaseQueue::new(),
            shaders: Registry::new(),
            textures: Registry::new(),
            meshes: Registry::new(),
            framebuffers: Registry::new(),
            sprite_atlases: Registry::new(),
            default_shaders: HashMap::new(),
            frame: RenderStats::default(),
            last_frame: RenderStats::default(),
            frame_count: 0,
            last_frame_end: Instant::now(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &ShaderPreprocessor {
        &self.preprocessor
    }

    /// Register an include module available to shaders created afterwards.
    pub fn register_include(&mut self, path: &str, source: &str) {
        self.preprocessor.register_include(path, source);
    }

    // Shaders

    /// Compile and link a shader. Nothing is allocated on failure.
    pub fn create_shader(&mut self, desc: ShaderDescriptor) -> Result<Arc<Shader>, CompileError> {
        let shader = Arc::new(self.build_shader(&desc)?);
        self.shaders.register(&shader);
        Ok(shader)
    }

    fn build_shader(&mut self, desc: &ShaderDescriptor) -> Result<Shader, CompileError> {
        self.release_pending();
        let compiled = compile_program(&self.preprocessor, &desc.sources).inspect_err(|err| {
            log::warn!("Shader '{}' failed to compile: {err}", desc.name);
        })?;
        let program = self
            .backend
            .create_program(&compiled.descriptor(&desc.name))?;
        log::info!(
            "Created shader '{}' ({} attributes, {} uniforms)",
            desc.name,
            compiled.reflection.attributes().len(),
            compiled.reflection.uniforms().len()
        );
        Ok(Shader::new(
            desc,
            program,
            compiled.reflection,
            self.release.clone(),
        ))
    }

    /// Recompile `shader` in place from new stage sources.
    ///
    /// On failure the shader keeps its previous program, reflection and sources.
    pub fn recompile_shader(
        &mut self,
        shader: &Shader,
        sources: BTreeMap<ShaderStage, String>,
    ) -> Result<(), CompileError> {
        self.release_pending();
        let compiled = compile_program(&self.preprocessor, &sources).inspect_err(|err| {
            log::warn!("Shader '{}' failed to recompile: {err}", shader.name());
        })?;
        let program = self
            .backend
            .create_program(&compiled.descriptor(shader.name()))?;
        shader.replace_program(program, compiled.reflection, sources);
        log::debug!(
            "Recompiled shader '{}' (generation {})",
            shader.name(),
            shader.generation()
        );
        Ok(())
    }

    /// Shared instance of a built-in shader, compiled on first use.
    pub fn default_shader(&mut self, kind: DefaultShader) -> Result<Arc<Shader>, CompileError> {
        if let Some(shader) = self.default_shaders.get(&kind) {
            return Ok(shader.clone());
        }
        let shader = self.create_shader(kind.descriptor())?;
        self.default_shaders.insert(kind, shader.clone());
        Ok(shader)
    }

    /// Source of one stage after include resolution and define injection.
    pub fn precompile(&self, source: &str, stage: ShaderStage) -> Result<String, CompileError> {
        self.preprocessor
            .preprocess(source, stage)
            .map_err(|message| CompileError::Preprocess { stage, message })
    }

    // Textures, meshes, framebuffers and atlases

    pub fn create_texture(&mut self, desc: TextureDescriptor) -> Result<Arc<Texture>, ResourceError> {
        let texture = self.create_texture_untracked(&desc)?;
        self.textures.register(&texture);
        Ok(texture)
    }

    /// Like [`create_texture`](Self::create_texture) but not listed in the registry.
    pub(crate) fn create_texture_untracked(
        &mut self,
        desc: &TextureDescriptor,
    ) -> Result<Arc<Texture>, ResourceError> {
        self.release_pending();
        let texture = Texture::create(&mut self.backend, desc, self.release.clone())?;
        log::debug!(
            "Created texture '{}' ({}x{} {:?})",
            texture.name(),
            texture.width(),
            texture.height(),
            texture.format()
        );
        Ok(Arc::new(texture))
    }

    pub fn create_mesh(&mut self, desc: MeshDescriptor) -> Result<Arc<Mesh>, ResourceError> {
        let mesh = self.create_mesh_untracked(&desc)?;
        self.meshes.register(&mesh);
        Ok(mesh)
    }

    pub(crate) fn create_mesh_untracked(
        &mut self,
        desc: &MeshDescriptor,
    ) -> Result<Arc<Mesh>, ResourceError> {
        self.release_pending();
        let mesh = Mesh::create(&mut self.backend, desc, self.release.clone())?;
        log::debug!(
            "Created mesh '{}' ({} vertices, {} index sets)",
            mesh.name(),
            mesh.vertex_count(),
            mesh.index_set_count()
        );
        Ok(Arc::new(mesh))
    }

    pub fn create_framebuffer(
        &mut self,
        desc: FramebufferDescriptor,
    ) -> Result<Arc<Framebuffer>, ResourceError> {
        let framebuffer = self.create_framebuffer_untracked(&desc)?;
        self.framebuffers.register(&framebuffer);
        Ok(framebuffer)
    }

    pub(crate) fn create_framebuffer_untracked(
        &mut self,
        desc: &FramebufferDescriptor,
    ) -> Result<Arc<Framebuffer>, ResourceError> {
        self.release_pending();
        Ok(Arc::new(Framebuffer::create(desc)?))
    }

    pub fn create_sprite_atlas(
        &mut self,
        desc: SpriteAtlasDescriptor,
    ) -> Result<Arc<SpriteAtlas>, ResourceError> {
        self.release_pending();
        let atlas = Arc::new(SpriteAtlas::create(&desc)?);
        self.sprite_atlases.register(&atlas);
        Ok(atlas)
    }

    // Registries

    pub fn shaders(&self) -> &Registry<Shader> {
        &self.shaders
    }

    pub fn textures(&self) -> &Registry<Texture> {
        &self.textures
    }

    pub fn meshes(&self) -> &Registry<Mesh> {
        &self.meshes
    }

    pub fn framebuffers(&self) -> &Registry<Framebuffer> {
        &self.framebuffers
    }

    pub fn sprite_atlases(&self) -> &Registry<SpriteAtlas> {
        &self.sprite_atlases
    }

    // Passes and frames

    /// Open a render pass. The context is borrowed until the pass ends.
    pub fn render_pass(&mut self, desc: RenderPassDescriptor) -> RenderPass<'_, B> {
        self.release_pending();
        RenderPass::begin(
            &mut self.backend,
            &mut self.frame,
            desc,
            self.config.clear_color,
        )
    }

    /// Counters of the frame in progress.
    pub fn frame_stats(&self) -> RenderStats {
        self.frame
    }

    /// Counters of the last completed frame.
    pub fn last_frame_stats(&self) -> RenderStats {
        self.last_frame
    }

    /// Recent completed frames.
    pub fn frame_history(&self) -> &FrameStatistics {
        &self.history
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Finish the frame: fill in resource totals, destroy GPU objects of
    /// dropped resources and reset the counters.
    pub fn end_frame(&mut self) -> RenderStats {
        let released = self.release_pending();

        let meshes = self.meshes.live();
        let textures = self.textures.live();
        let mut stats = self.frame;
        stats.mesh_count = meshes.len() as u32;
        stats.mesh_bytes = meshes.iter().map(|m| m.data_size()).sum();
        stats.texture_count = textures.len() as u32;
        stats.texture_bytes = textures.iter().map(|t| t.data_size()).sum();

        let now = Instant::now();
        let delta_ms = now.duration_since(self.last_frame_end).as_secs_f32() * 1000.0;
        self.last_frame_end = now;
        self.history.push(stats, delta_ms);

        log::trace!(
            "Frame {} done: {} draw calls, {} state changes, {released} objects released",
            self.frame_count,
            stats.draw_calls,
            stats.state_changes()
        );

        self.last_frame = stats;
        self.frame = RenderStats::default();
        self.frame_count += 1;
        stats
    }

    fn release_pending(&mut self) -> usize {
        self.release.release_all(&mut self.backend)
    }
}

impl<B: GraphicsBackend> Drop for RenderContext<B> {
    fn drop(&mut self) {
        // Default shaders are owned here; the rest may outlive the context
        self.default_shaders.clear();
        self.release_pending();
    }
}
