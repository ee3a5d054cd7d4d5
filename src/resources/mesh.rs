//! Mesh data structures and generation

use std::fmt;

use glam::{IVec4, Vec2, Vec3, Vec4};

use crate::backend::{
    BufferHandle, BufferUsage, GpuBufferDescriptor, GraphicsBackend, Topology, VertexFormat,
};
use crate::error::ResourceError;
use crate::resources::next_resource_id;
use crate::resources::release::{PendingRelease, ReleaseQueue};

/// Per-vertex values of one named attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Float(Vec<f32>),
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
    Vec4(Vec<Vec4>),
    IVec4(Vec<IVec4>),
}

impl AttributeData {
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Float(v) => v.len(),
            AttributeData::Vec2(v) => v.len(),
            AttributeData::Vec3(v) => v.len(),
            AttributeData::Vec4(v) => v.len(),
            AttributeData::IVec4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> VertexFormat {
        match self {
            AttributeData::Float(_) => VertexFormat::Float32,
            AttributeData::Vec2(_) => VertexFormat::Float32x2,
            AttributeData::Vec3(_) => VertexFormat::Float32x3,
            AttributeData::Vec4(_) => VertexFormat::Float32x4,
            AttributeData::IVec4(_) => VertexFormat::Sint32x4,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::Float(v) => bytemuck::cast_slice(v),
            AttributeData::Vec2(v) => bytemuck::cast_slice(v),
            AttributeData::Vec3(v) => bytemuck::cast_slice(v),
            AttributeData::Vec4(v) => bytemuck::cast_slice(v),
            AttributeData::IVec4(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: &[Vec3]) -> Self {
        match points.split_first() {
            Some((first, rest)) => rest.iter().fold(
                Bounds {
                    min: *first,
                    max: *first,
                },
                |b, p| Bounds {
                    min: b.min.min(*p),
                    max: b.max.max(*p),
                },
            ),
            None => Bounds {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            },
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Configuration for building a [`Mesh`]. Validated by the render context.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    pub name: String,
    pub attributes: Vec<(String, AttributeData)>,
    pub index_sets: Vec<Vec<u32>>,
    pub topology: Topology,
}

impl MeshDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            index_sets: Vec::new(),
            topology: Topology::Triangles,
        }
    }

    /// Add or replace a named attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, data: AttributeData) -> Self {
        let name = name.into();
        self.attributes.retain(|(n, _)| *n != name);
        self.attributes.push((name, data));
        self
    }

    pub fn with_positions(self, positions: Vec<Vec3>) -> Self {
        self.with_attribute("position", AttributeData::Vec3(positions))
    }

    pub fn with_normals(self, normals: Vec<Vec3>) -> Self {
        self.with_attribute("normal", AttributeData::Vec3(normals))
    }

    pub fn with_uvs(self, uvs: Vec<Vec2>) -> Self {
        self.with_attribute("uv", AttributeData::Vec2(uvs))
    }

    pub fn with_colors(self, colors: Vec<Vec4>) -> Self {
        self.with_attribute("color", AttributeData::Vec4(colors))
    }

    /// Append an index set. Each set is drawn with its own material.
    pub fn with_index_set(mut self, indices: Vec<u32>) -> Self {
        self.index_sets.push(indices);
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeData> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    /// Unit cube centered at origin
    pub fn cube() -> Self {
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, -Vec3::X, Vec3::Y),
            (Vec3::X, -Vec3::Z, Vec3::Y),
            (-Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, -Vec3::Z),
            (-Vec3::Y, Vec3::X, Vec3::Z),
        ];
        let corners = [
            (Vec2::new(-0.5, -0.5), Vec2::new(0.0, 1.0)),
            (Vec2::new(0.5, -0.5), Vec2::new(1.0, 1.0)),
            (Vec2::new(0.5, 0.5), Vec2::new(1.0, 0.0)),
            (Vec2::new(-0.5, 0.5), Vec2::new(0.0, 0.0)),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, (normal, right, up)) in faces.iter().enumerate() {
            for (corner, uv) in corners {
                positions.push(*normal * 0.5 + *right * corner.x + *up * corner.y);
                normals.push(*normal);
                uvs.push(uv);
            }
            let base = face as u32 * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new("Cube")
            .with_positions(positions)
            .with_normals(normals)
            .with_uvs(uvs)
            .with_index_set(indices)
    }

    /// UV sphere of radius 0.5
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let segment_angle = 2.0 * std::f32::consts::PI / segments as f32;
        let ring_angle = std::f32::consts::PI / rings as f32;

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        for ring in 0..=rings {
            let phi = ring as f32 * ring_angle;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for segment in 0..=segments {
                let theta = segment as f32 * segment_angle;
                let normal = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                positions.push(normal * 0.5);
                normals.push(normal.normalize_or_zero());
                uvs.push(Vec2::new(
                    segment as f32 / segments as f32,
                    ring as f32 / rings as f32,
                ));
            }
        }

        let mut indices = Vec::new();
        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;
                indices.extend_from_slice(&[
                    current,
                    current + 1,
                    next,
                    current + 1,
                    next + 1,
                    next,
                ]);
            }
        }

        Self::new("Sphere")
            .with_positions(positions)
            .with_normals(normals)
            .with_uvs(uvs)
            .with_index_set(indices)
    }

    /// Unit quad on the XY plane facing +Z
    pub fn quad() -> Self {
        Self::new("Quad")
            .with_positions(vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ])
            .with_normals(vec![Vec3::Z; 4])
            .with_uvs(vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ])
            .with_index_set(vec![0, 1, 2, 0, 2, 3])
    }

    /// Plane on the XZ axis
    pub fn plane(width: f32, depth: f32, subdivisions: u32) -> Self {
        let subdivisions = subdivisions.max(1);
        let step_x = width / subdivisions as f32;
        let step_z = depth / subdivisions as f32;

        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        for z in 0..=subdivisions {
            for x in 0..=subdivisions {
                positions.push(Vec3::new(
                    -width / 2.0 + x as f32 * step_x,
                    0.0,
                    -depth / 2.0 + z as f32 * step_z,
                ));
                uvs.push(Vec2::new(
                    x as f32 / subdivisions as f32,
                    z as f32 / subdivisions as f32,
                ));
            }
        }

        let mut indices = Vec::new();
        for z in 0..subdivisions {
            for x in 0..subdivisions {
                let current = z * (subdivisions + 1) + x;
                let next = current + subdivisions + 1;
                indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        let vertex_count = positions.len();
        Self::new("Plane")
            .with_positions(positions)
            .with_normals(vec![Vec3::Y; vertex_count])
            .with_uvs(uvs)
            .with_index_set(indices)
    }

    fn validate(&self) -> Result<usize, ResourceError> {
        let invalid = |reason: String| {
            Err(ResourceError::InvalidDescriptor(format!(
                "mesh '{}': {reason}",
                self.name
            )))
        };
        let vertex_count = match self.attribute("position") {
            Some(AttributeData::Vec3(positions)) => positions.len(),
            Some(_) => return invalid("'position' must be vec3".to_string()),
            None => return invalid("missing 'position' attribute".to_string()),
        };
        for (name, data) in &self.attributes {
            if data.len() != vertex_count {
                return invalid(format!(
                    "attribute '{name}' has {} vertices, expected {vertex_count}",
                    data.len()
                ));
            }
        }
        for (set, indices) in self.index_sets.iter().enumerate() {
            if let Some(index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return invalid(format!(
                    "index set {set} references vertex {index} of {vertex_count}"
                ));
            }
        }
        Ok(vertex_count)
    }
}

/// A GPU buffer holding one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshAttribute {
    pub name: String,
    pub format: VertexFormat,
    pub buffer: BufferHandle,
    pub byte_size: u64,
}

/// A GPU buffer holding one index set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSet {
    pub buffer: BufferHandle,
    pub count: u32,
}

/// Immutable GPU mesh
pub struct Mesh {
    id: u64,
    name: String,
    vertex_count: u32,
    attributes: Vec<MeshAttribute>,
    index_sets: Vec<IndexSet>,
    topology: Topology,
    bounds: Bounds,
    release: ReleaseQueue,
}

impl Mesh {
    /// Validate and upload. Buffers created before a failed allocation are released.
    pub(crate) fn create<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        desc: &MeshDescriptor,
        release: ReleaseQueue,
    ) -> Result<Self, ResourceError> {
        let vertex_count = desc.validate()?;
        let bounds = match desc.attribute("position") {
            Some(AttributeData::Vec3(positions)) => Bounds::from_points(positions),
            _ => Bounds::from_points(&[]),
        };

        let mut mesh = Self {
            id: next_resource_id(),
            name: desc.name.clone(),
            vertex_count: vertex_count as u32,
            attributes: Vec::with_capacity(desc.attributes.len()),
            index_sets: Vec::with_capacity(desc.index_sets.len()),
            topology: desc.topology,
            bounds,
            release,
        };

        // On error `mesh` drops and queues what was already uploaded
        for (name, data) in &desc.attributes {
            let bytes = data.as_bytes();
            let buffer = backend.create_buffer_init(
                &GpuBufferDescriptor {
                    label: format!("{}.{}", desc.name, name),
                    size: bytes.len() as u64,
                    usage: BufferUsage::Vertex,
                },
                bytes,
            )?;
            mesh.attributes.push(MeshAttribute {
                name: name.clone(),
                format: data.format(),
                buffer,
                byte_size: bytes.len() as u64,
            });
        }
        for (set, indices) in desc.index_sets.iter().enumerate() {
            let bytes: &[u8] = bytemuck::cast_slice(indices);
            let buffer = backend.create_buffer_init(
                &GpuBufferDescriptor {
                    label: format!("{}.indices{}", desc.name, set),
                    size: bytes.len() as u64,
                    usage: BufferUsage::Index,
                },
                bytes,
            )?;
            mesh.index_sets.push(IndexSet {
                buffer,
                count: indices.len() as u32,
            });
        }

        Ok(mesh)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn attributes(&self) -> &[MeshAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&MeshAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn index_sets(&self) -> &[IndexSet] {
        &self.index_sets
    }

    pub fn index_set_count(&self) -> usize {
        self.index_sets.len()
    }

    /// Materials a draw of this mesh requires.
    pub fn sub_mesh_count(&self) -> usize {
        self.index_sets.len().max(1)
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Bytes held in vertex and index buffers.
    pub fn data_size(&self) -> u64 {
        let vertex_bytes: u64 = self.attributes.iter().map(|a| a.byte_size).sum();
        let index_bytes: u64 = self.index_sets.iter().map(|s| s.count as u64 * 4).sum();
        vertex_bytes + index_bytes
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("vertex_count", &self.vertex_count)
            .field("index_sets", &self.index_sets.len())
            .finish()
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        for attribute in &self.attributes {
            self.release.push(PendingRelease::Buffer(attribute.buffer));
        }
        for set in &self.index_sets {
            self.release.push(PendingRelease::Buffer(set.buffer));
        }
    }
}
