//! wgpu backend implementation
//!
//! Headless: the "screen" is an offscreen color texture of
//! [`surface_size`](GraphicsBackend::surface_size) that can be read back with
//! [`WgpuBackend::read_screen`]. Commands are buffered per pass and replayed
//! when the pass ends, with one render pipeline cached per program and
//! pipeline state. Programs need WGSL for a vertex and a fragment stage and
//! may only bind resources in group 0.

mod pipeline;

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{BackendError, BackendResult};
use crate::shader::ShaderStage;
use pipeline::{convert_texture_format, convert_vertex_format, convert_wrap, is_filterable, PipelineKey};

const SCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Large enough for the widest vertex format
const ZERO_BUFFER_SIZE: u64 = 16;

struct ProgramEntry {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    blocks: Vec<BlockLayout>,
    textures: Vec<TextureLayout>,
    attributes: Vec<AttributeLayout>,
}

struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    format: TextureFormat,
    width: u32,
    height: u32,
}

/// A draw with the bindings that were current when it was issued
struct DrawCall {
    program: ProgramHandle,
    state: PipelineState,
    vertex: Vec<(u32, Option<BufferHandle>, VertexFormat)>,
    index: Option<BufferHandle>,
    blocks: BTreeMap<u32, Vec<u8>>,
    textures: BTreeMap<u32, Option<TextureHandle>>,
    range: Range<u32>,
    indexed: bool,
}

/// Pending render pass with buffered draws
struct PendingRenderPass {
    descriptor: PassDescriptor,
    draws: Vec<DrawCall>,
}

/// Bindings set since the last program change
#[derive(Default)]
struct BindingState {
    program: Option<ProgramHandle>,
    pipeline: PipelineState,
    vertex: BTreeMap<u32, (Option<BufferHandle>, VertexFormat)>,
    index: Option<BufferHandle>,
    blocks: BTreeMap<u32, Vec<u8>>,
    textures: BTreeMap<u32, Option<TextureHandle>>,
}

/// wgpu backend implementation
pub struct WgpuBackend {
    name: String,
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    surface_size: (u32, u32),
    screen: TextureEntry,
    screen_depth: wgpu::TextureView,

    // Resource storage
    programs: HashMap<u64, ProgramEntry>,
    buffers: HashMap<u64, wgpu::Buffer>,
    textures: HashMap<u64, TextureEntry>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    next_id: u64,

    zero_buffer: wgpu::Buffer,
    white_texture: TextureEntry,
    white_cubemap: TextureEntry,

    bindings: BindingState,
    pending_render_pass: Option<PendingRenderPass>,
}

impl WgpuBackend {
    /// Create a headless backend rendering to a `width` x `height` screen texture.
    pub fn new_headless(width: u32, height: u32) -> BackendResult<Self> {
        pollster::block_on(Self::new_async(width, height))
    }

    pub async fn new_async(width: u32, height: u32) -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::InitializationFailed("No suitable adapter found".into()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Render Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            log::error!("wgpu error: {error}");
        }));

        let width = width.max(1);
        let height = height.max(1);
        let screen = create_screen(&device, width, height);
        let screen_depth = create_depth_view(&device, width, height);
        let zero_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Zero attribute"),
            contents: &[0; ZERO_BUFFER_SIZE as usize],
            usage: wgpu::BufferUsages::VERTEX,
        });
        let white_texture = create_white_texture(&device, &queue, false);
        let white_cubemap = create_white_texture(&device, &queue, true);

        Ok(Self {
            name: format!("wgpu ({})", adapter_info.name),
            instance,
            adapter,
            device,
            queue,
            surface_size: (width, height),
            screen,
            screen_depth,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            pipelines: HashMap::new(),
            next_id: 1,
            zero_buffer,
            white_texture,
            white_cubemap,
            bindings: BindingState::default(),
            pending_render_pass: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Resize the screen texture. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.surface_size {
            return;
        }
        self.surface_size = (width, height);
        self.screen = create_screen(&self.device, width, height);
        self.screen_depth = create_depth_view(&self.device, width, height);
    }

    /// Number of render pipelines built so far.
    pub fn cached_pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// RGBA8 pixels of the screen texture, rows top to bottom.
    pub fn read_screen(&self) -> BackendResult<Vec<u8>> {
        read_back(&self.device, &self.queue, &self.screen)
    }

    /// Base level pixels of a 2D texture.
    pub fn read_texture(&self, texture: TextureHandle) -> BackendResult<Vec<u8>> {
        let entry = self
            .textures
            .get(&texture.0)
            .ok_or(BackendError::InvalidHandle(texture.0))?;
        read_back(&self.device, &self.queue, entry)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn create_module(&self, label: &str, wgsl: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        })
    }

    fn texture_or_fallback(&self, layout: &TextureLayout, texture: Option<TextureHandle>) -> &TextureEntry {
        let fallback = if layout.cubemap {
            &self.white_cubemap
        } else {
            &self.white_texture
        };
        let Some(handle) = texture else {
            return fallback;
        };
        match self.textures.get(&handle.0) {
            Some(entry) if is_filterable(entry.format) => entry,
            Some(entry) => {
                log::warn!("{:?} textures cannot be sampled with filtering; binding fallback", entry.format);
                fallback
            }
            None => fallback,
        }
    }

    fn pass_formats(&self, target: &PassTarget) -> (Vec<wgpu::TextureFormat>, Option<wgpu::TextureFormat>) {
        match target {
            PassTarget::Screen => (vec![SCREEN_FORMAT], Some(DEPTH_FORMAT)),
            PassTarget::Textures { colors, depth, .. } => {
                let colors = colors
                    .iter()
                    .filter_map(|c| self.textures.get(&c.0))
                    .map(|t| convert_texture_format(t.format))
                    .collect();
                let depth = depth
                    .and_then(|d| self.textures.get(&d.0))
                    .map(|t| convert_texture_format(t.format));
                (colors, depth)
            }
        }
    }

    fn ensure_pipeline(&mut self, key: &PipelineKey) -> BackendResult<()> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }
        let program = self
            .programs
            .get(&key.program)
            .ok_or(BackendError::InvalidHandle(key.program))?;

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .vertex
            .iter()
            .map(|(location, format, _)| {
                [wgpu::VertexAttribute {
                    format: convert_vertex_format(*format),
                    offset: 0,
                    shader_location: *location,
                }]
            })
            .collect();
        // Missing attributes read the zero buffer once per instance
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = key
            .vertex
            .iter()
            .zip(attributes.iter())
            .map(|((_, format, bound), attributes)| wgpu::VertexBufferLayout {
                array_stride: if *bound { format.size() } else { 0 },
                step_mode: if *bound {
                    wgpu::VertexStepMode::Vertex
                } else {
                    wgpu::VertexStepMode::Instance
                },
                attributes,
            })
            .collect();

        let blend = key.blend_state();
        let targets: Vec<Option<wgpu::ColorTargetState>> = key
            .colors
            .iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format: *format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&program.label),
                layout: Some(&program.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: None,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &vertex_buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: None,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &targets,
                }),
                primitive: key.primitive(),
                depth_stencil: key.depth_stencil(),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        log::debug!(
            "Built pipeline for '{}' ({} cached)",
            program.label,
            self.pipelines.len() + 1
        );
        self.pipelines.insert(key.clone(), pipeline);
        Ok(())
    }

    /// Uniform data of every draw, packed at the device's offset alignment.
    fn pack_uniforms(&self, draws: &[DrawCall]) -> (Vec<u8>, Vec<Vec<(u32, u64, u64)>>) {
        let alignment = u64::from(self.device.limits().min_uniform_buffer_offset_alignment);
        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(draws.len());
        for draw in draws {
            let Some(program) = self.programs.get(&draw.program.0) else {
                offsets.push(Vec::new());
                continue;
            };
            let mut draw_offsets = Vec::with_capacity(program.blocks.len());
            for block in &program.blocks {
                let size = u64::from(block.size.max(16));
                let offset = (data.len() as u64).next_multiple_of(alignment);
                data.resize(offset as usize, 0);
                let bytes = draw.blocks.get(&block.binding).map(Vec::as_slice).unwrap_or(&[]);
                let copied = bytes.len().min(size as usize);
                data.extend_from_slice(&bytes[..copied]);
                data.resize((offset + size) as usize, 0);
                draw_offsets.push((block.binding, offset, size));
            }
            offsets.push(draw_offsets);
        }
        (data, offsets)
    }

    fn execute(&mut self, pending: PendingRenderPass) -> BackendResult<()> {
        let (colors, depth) = self.pass_formats(&pending.descriptor.target);

        let mut keys = Vec::with_capacity(pending.draws.len());
        for draw in &pending.draws {
            let key = PipelineKey::new(
                draw.program,
                &draw.state,
                draw.vertex
                    .iter()
                    .map(|(location, buffer, format)| (*location, *format, buffer.is_some()))
                    .collect(),
                colors.clone(),
                depth,
            );
            self.ensure_pipeline(&key)?;
            keys.push(key);
        }

        let (uniform_data, uniform_offsets) = self.pack_uniforms(&pending.draws);
        let uniform_buffer = (!uniform_data.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Pass uniforms"),
                contents: &uniform_data,
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        let mut bind_groups = Vec::with_capacity(pending.draws.len());
        for (draw, offsets) in pending.draws.iter().zip(&uniform_offsets) {
            let program = self
                .programs
                .get(&draw.program.0)
                .ok_or(BackendError::InvalidHandle(draw.program.0))?;
            let mut entries = Vec::new();
            if let Some(buffer) = &uniform_buffer {
                for (binding, offset, size) in offsets {
                    entries.push(wgpu::BindGroupEntry {
                        binding: *binding,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset: *offset,
                            size: NonZeroU64::new(*size),
                        }),
                    });
                }
            }
            for layout in &program.textures {
                let texture = draw.textures.get(&layout.binding).copied().flatten();
                let entry = self.texture_or_fallback(layout, texture);
                entries.push(wgpu::BindGroupEntry {
                    binding: layout.binding,
                    resource: wgpu::BindingResource::TextureView(&entry.view),
                });
                if let Some(sampler_binding) = layout.sampler_binding {
                    entries.push(wgpu::BindGroupEntry {
                        binding: sampler_binding,
                        resource: wgpu::BindingResource::Sampler(&entry.sampler),
                    });
                }
            }
            bind_groups.push(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&program.label),
                layout: &program.bind_group_layout,
                entries: &entries,
            }));
        }

        let descriptor = &pending.descriptor;
        let (color_views, depth_view): (Vec<&wgpu::TextureView>, Option<&wgpu::TextureView>) =
            match &descriptor.target {
                PassTarget::Screen => (vec![&self.screen.view], Some(&self.screen_depth)),
                PassTarget::Textures { colors, depth, .. } => (
                    colors
                        .iter()
                        .filter_map(|c| self.textures.get(&c.0))
                        .map(|t| &t.view)
                        .collect(),
                    depth.and_then(|d| self.textures.get(&d.0)).map(|t| &t.view),
                ),
            };

        let load = match descriptor.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            }),
            None => wgpu::LoadOp::Load,
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();
        let depth_attachment = depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: if descriptor.clear_depth {
                    wgpu::LoadOp::Clear(1.0)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&descriptor.label),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&descriptor.label),
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for ((draw, key), bind_group) in pending.draws.iter().zip(&keys).zip(&bind_groups) {
                let Some(pipeline) = self.pipelines.get(key) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, bind_group, &[]);
                for (slot, (_, buffer, _)) in draw.vertex.iter().enumerate() {
                    let buffer = buffer
                        .and_then(|b| self.buffers.get(&b.0))
                        .unwrap_or(&self.zero_buffer);
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                match draw.index.and_then(|i| self.buffers.get(&i.0)) {
                    Some(index) if draw.indexed => {
                        render_pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(draw.range.clone(), 0, 0..1);
                    }
                    _ if draw.indexed => {
                        log::warn!("Indexed draw without index buffer skipped");
                    }
                    _ => render_pass.draw(draw.range.clone(), 0..1),
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        let find = |stage: ShaderStage| desc.stages.iter().find(|s| s.stage == stage);
        if let Some(extra) = desc
            .stages
            .iter()
            .find(|s| !matches!(s.stage, ShaderStage::Vertex | ShaderStage::Fragment))
        {
            return Err(BackendError::ProgramCreationFailed(format!(
                "{} stages are not supported by wgpu",
                extra.stage
            )));
        }
        let (Some(vertex_stage), Some(fragment_stage)) =
            (find(ShaderStage::Vertex), find(ShaderStage::Fragment))
        else {
            return Err(BackendError::ProgramCreationFailed(
                "vertex and fragment stages are required".into(),
            ));
        };
        if let Some(group) = desc
            .blocks
            .iter()
            .map(|b| b.group)
            .chain(desc.textures.iter().map(|t| t.group))
            .find(|group| *group != 0)
        {
            return Err(BackendError::ProgramCreationFailed(format!(
                "bind group {group} is not supported, only group 0"
            )));
        }

        let vertex_wgsl = stage_wgsl(&desc.label, vertex_stage)?;
        let fragment_wgsl = stage_wgsl(&desc.label, fragment_stage)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = self.create_module(&desc.label, vertex_wgsl);
        let fragment = self.create_module(&desc.label, fragment_wgsl);

        let mut entries = Vec::new();
        for block in &desc.blocks {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(u64::from(block.size)),
                },
                count: None,
            });
        }
        for texture in &desc.textures {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: if texture.cubemap {
                        wgpu::TextureViewDimension::Cube
                    } else {
                        wgpu::TextureViewDimension::D2
                    },
                    multisampled: false,
                },
                count: None,
            });
            if let Some(binding) = texture.sampler_binding {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
        }
        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&desc.label),
                entries: &entries,
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&desc.label),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::ProgramCreationFailed(error.to_string()));
        }

        let id = self.allocate_id();
        self.programs.insert(
            id,
            ProgramEntry {
                label: desc.label.clone(),
                vertex,
                fragment,
                bind_group_layout,
                pipeline_layout,
                blocks: desc.blocks.clone(),
                textures: desc.textures.clone(),
                attributes: desc.attributes.clone(),
            },
        );
        Ok(ProgramHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &GpuBufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&desc.label),
            contents: data,
            usage,
        });

        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn create_texture(&mut self, desc: &GpuTextureDescriptor) -> BackendResult<TextureHandle> {
        let limit = self.device.limits().max_texture_dimension_2d;
        if desc.width > limit || desc.height > limit {
            return Err(BackendError::TextureCreationFailed(format!(
                "{}x{} exceeds the device limit of {limit}",
                desc.width, desc.height
            )));
        }

        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if desc.render_target || desc.format.is_depth() {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: desc.layers(),
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: convert_texture_format(desc.format),
            usage,
            view_formats: &[],
        });
        if desc.mip_levels > 1 {
            log::debug!("'{}': mipmap generation is not supported, using the base level", desc.label);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(if desc.cubemap {
                wgpu::TextureViewDimension::Cube
            } else {
                wgpu::TextureViewDimension::D2
            }),
            ..Default::default()
        });
        let filter = if desc.filter_linear {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&desc.label),
            address_mode_u: convert_wrap(desc.wrap),
            address_mode_v: convert_wrap(desc.wrap),
            address_mode_w: convert_wrap(desc.wrap),
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let id = self.allocate_id();
        self.textures.insert(
            id,
            TextureEntry {
                texture,
                view,
                sampler,
                format: desc.format,
                width: desc.width,
                height: desc.height,
            },
        );
        Ok(TextureHandle(id))
    }

    fn write_texture(&mut self, texture: TextureHandle, layer: u32, data: &[u8]) {
        let Some(entry) = self.textures.get(&texture.0) else {
            return;
        };
        let bytes_per_row = entry.width * entry.format.bytes_per_pixel();
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(entry.height),
            },
            wgpu::Extent3d {
                width: entry.width,
                height: entry.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn begin_render_pass(&mut self, desc: &PassDescriptor) {
        if self.pending_render_pass.is_some() {
            log::warn!("Render pass '{}' begun inside another pass", desc.label);
            self.end_render_pass();
        }
        self.bindings = BindingState::default();
        self.pending_render_pass = Some(PendingRenderPass {
            descriptor: desc.clone(),
            draws: Vec::new(),
        });
    }

    fn end_render_pass(&mut self) {
        let Some(pending) = self.pending_render_pass.take() else {
            return;
        };
        let label = pending.descriptor.label.clone();
        if let Err(err) = self.execute(pending) {
            log::error!("Render pass '{label}' failed: {err}");
        }
    }

    fn set_program(&mut self, program: ProgramHandle) {
        self.bindings.program = Some(program);
    }

    fn set_pipeline_state(&mut self, state: &PipelineState) {
        self.bindings.pipeline = *state;
    }

    fn set_uniform_block(&mut self, group: u32, binding: u32, data: &[u8]) {
        if group != 0 {
            return;
        }
        self.bindings.blocks.insert(binding, data.to_vec());
    }

    fn set_texture(&mut self, layout: &TextureLayout, texture: Option<TextureHandle>) {
        if layout.group != 0 {
            return;
        }
        self.bindings.textures.insert(layout.binding, texture);
    }

    fn set_vertex_buffer(&mut self, location: u32, buffer: Option<BufferHandle>, format: VertexFormat) {
        self.bindings.vertex.insert(location, (buffer, format));
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.bindings.index = Some(buffer);
    }

    fn draw(&mut self, vertices: Range<u32>) {
        self.record_draw(vertices, false);
    }

    fn draw_indexed(&mut self, indices: Range<u32>) {
        self.record_draw(indices, true);
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
        self.pipelines.retain(|key, _| key.program != program.0);
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&buffer.0) {
            buffer.destroy();
        }
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(entry) = self.textures.remove(&texture.0) {
            entry.texture.destroy();
        }
    }
}

impl WgpuBackend {
    fn record_draw(&mut self, range: Range<u32>, indexed: bool) {
        let Some(pending) = self.pending_render_pass.as_mut() else {
            log::warn!("Draw outside of a render pass ignored");
            return;
        };
        let Some(program) = self.bindings.program else {
            log::warn!("Draw without a program ignored");
            return;
        };
        let Some(entry) = self.programs.get(&program.0) else {
            log::warn!("Draw with destroyed program {} ignored", program.0);
            return;
        };
        let vertex = entry
            .attributes
            .iter()
            .map(|attribute| match self.bindings.vertex.get(&attribute.location) {
                Some((buffer, format)) => (attribute.location, *buffer, *format),
                None => (attribute.location, None, attribute.format),
            })
            .collect();
        pending.draws.push(DrawCall {
            program,
            state: self.bindings.pipeline,
            vertex,
            index: self.bindings.index,
            blocks: self.bindings.blocks.clone(),
            textures: self.bindings.textures.clone(),
            range,
            indexed,
        });
    }
}

fn stage_wgsl<'a>(label: &str, stage: &'a CompiledStage) -> BackendResult<&'a str> {
    stage.wgsl.as_deref().ok_or_else(|| {
        BackendError::ProgramCreationFailed(format!("{} stage of '{label}' has no WGSL", stage.stage))
    })
}

fn create_screen(device: &wgpu::Device, width: u32, height: u32) -> TextureEntry {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Screen"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());
    TextureEntry {
        texture,
        view,
        sampler,
        format: TextureFormat::Rgba8UnormSrgb,
        width,
        height,
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Screen depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

/// 1x1 white texture bound where a texture uniform has no value.
fn create_white_texture(device: &wgpu::Device, queue: &wgpu::Queue, cubemap: bool) -> TextureEntry {
    let layers = if cubemap { 6 } else { 1 };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(if cubemap { "White cubemap" } else { "White" }),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &vec![255u8; 4 * layers as usize],
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(if cubemap {
            wgpu::TextureViewDimension::Cube
        } else {
            wgpu::TextureViewDimension::D2
        }),
        ..Default::default()
    });
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());
    TextureEntry {
        texture,
        view,
        sampler,
        format: TextureFormat::Rgba8Unorm,
        width: 1,
        height: 1,
    }
}

fn read_back(device: &wgpu::Device, queue: &wgpu::Queue, entry: &TextureEntry) -> BackendResult<Vec<u8>> {
    let bytes_per_pixel = entry.format.bytes_per_pixel();
    let row_bytes = entry.width * bytes_per_pixel;
    let padded_row_bytes = row_bytes.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Read back"),
        size: u64::from(padded_row_bytes) * u64::from(entry.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Read back"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &entry.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row_bytes),
                rows_per_image: Some(entry.height),
            },
        },
        wgpu::Extent3d {
            width: entry.width,
            height: entry.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    let _ = device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|e| BackendError::TextureCreationFailed(e.to_string()))?
        .map_err(|e| BackendError::TextureCreationFailed(e.to_string()))?;

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((row_bytes * entry.height) as usize);
    for row in mapped.chunks(padded_row_bytes as usize) {
        pixels.extend_from_slice(&row[..row_bytes as usize]);
    }
    drop(mapped);
    buffer.unmap();
    Ok(pixels)
}
