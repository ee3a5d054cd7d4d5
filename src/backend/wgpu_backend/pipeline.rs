//! Pipeline cache keys and wgpu state conversion

use crate::backend::types::*;

/// Everything a render pipeline is specialized on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub program: u64,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
    /// `PolygonOffset` as raw bits so the key can be hashed
    pub polygon_offset: (u32, u32),
    pub topology: Topology,
    /// Per program attribute: location, bound format and whether a mesh buffer backs it
    pub vertex: Vec<(u32, VertexFormat, bool)>,
    pub colors: Vec<wgpu::TextureFormat>,
    pub depth: Option<wgpu::TextureFormat>,
}

impl PipelineKey {
    pub fn new(
        program: ProgramHandle,
        state: &PipelineState,
        vertex: Vec<(u32, VertexFormat, bool)>,
        colors: Vec<wgpu::TextureFormat>,
        depth: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            program: program.0,
            depth_test: state.depth_test,
            depth_write: state.depth_write,
            blend: state.blend,
            polygon_offset: (
                state.polygon_offset.factor.to_bits(),
                state.polygon_offset.units.to_bits(),
            ),
            topology: state.topology,
            vertex,
            colors,
            depth,
        }
    }

    pub fn primitive(&self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: match self.topology {
                Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
                Topology::Lines => wgpu::PrimitiveTopology::LineList,
                Topology::Points => wgpu::PrimitiveTopology::PointList,
            },
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        }
    }

    pub fn depth_stencil(&self) -> Option<wgpu::DepthStencilState> {
        let format = self.depth?;
        let factor = f32::from_bits(self.polygon_offset.0);
        let units = f32::from_bits(self.polygon_offset.1);
        // Depth bias is only valid for triangle topologies
        let bias = if self.topology == Topology::Triangles {
            wgpu::DepthBiasState {
                constant: units as i32,
                slope_scale: factor,
                clamp: 0.0,
            }
        } else {
            wgpu::DepthBiasState::default()
        };
        Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_write,
            depth_compare: if self.depth_test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias,
        })
    }

    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        match self.blend {
            BlendMode::Disabled => None,
            BlendMode::AlphaBlending => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::AdditiveBlending => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
        }
    }
}

pub(super) fn convert_texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

pub(super) fn convert_vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32 => wgpu::VertexFormat::Float32,
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        VertexFormat::Sint32 => wgpu::VertexFormat::Sint32,
        VertexFormat::Sint32x2 => wgpu::VertexFormat::Sint32x2,
        VertexFormat::Sint32x3 => wgpu::VertexFormat::Sint32x3,
        VertexFormat::Sint32x4 => wgpu::VertexFormat::Sint32x4,
    }
}

pub(super) fn convert_wrap(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

/// Formats a filtering float sampler may read without extra device features.
pub(super) fn is_filterable(format: TextureFormat) -> bool {
    !matches!(format, TextureFormat::Rgba32Float | TextureFormat::Depth32Float)
}
